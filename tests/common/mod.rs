#![allow(dead_code)]
use hdf5::File;
use ndarray::{Array, Array4};
use std::fs;
use std::path::{Path, PathBuf};
use westaux::defaults::{AUXDATA_GROUP, CURRENT_ITERATION_ATTR, DATASET_NAME, ITER_PREC, SEG_INDEX};
use westaux::h5io::{ensure_group, iter_group_name, require_iter_group, WriteSettings};
use westaux::{Configuration, Crawler};

/// Writes a minimal main data file with `n_iters` complete iterations of `n_segs`
/// segments each. The simulation is working on iteration `n_iters + 1`.
pub fn write_west_h5(path: &Path, n_iters: u64, n_segs: usize, with_auxdata: bool) {
    let file = File::create(path).unwrap();
    file.new_attr::<i64>()
        .create(CURRENT_ITERATION_ATTR)
        .unwrap()
        .write_scalar(&(n_iters as i64 + 1))
        .unwrap();
    for n_iter in 1..=n_iters {
        let group = require_iter_group(&file, n_iter, ITER_PREC).unwrap();
        group
            .new_dataset::<i64>()
            .shape(n_segs)
            .create(SEG_INDEX)
            .unwrap();
        if with_auxdata {
            ensure_group(&group, AUXDATA_GROUP).unwrap();
        }
    }
}

/// Writes a serialized OpenMM state with positions given in nm.
pub fn write_state(path: &Path, positions: &[[f64; 3]]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut text = String::from("<?xml version=\"1.0\" ?>\n<State type=\"State\" version=\"1\">\n\t<Positions>\n");
    for p in positions.iter() {
        text.push_str(&format!(
            "\t\t<Position x=\"{}\" y=\"{}\" z=\"{}\"/>\n",
            p[0], p[1], p[2]
        ));
    }
    text.push_str("\t</Positions>\n</State>\n");
    fs::write(path, text).unwrap();
}

/// Position of the single atom of a segment frame, distinct for every iteration/segment/frame.
pub fn frame_position(n_iter: u64, seg_id: usize, frame: usize) -> [f64; 3] {
    let base = n_iter as f64 + 0.1 * seg_id as f64 + 0.01 * frame as f64;
    [base, base + 0.25, base - 0.5]
}

/// A simulation tree with a one atom topology and parent/child frames for every segment.
pub fn write_simulation(root: &Path, n_iters: u64, n_segs: usize) {
    write_west_h5(&root.join("west.h5"), n_iters, n_segs, false);
    fs::create_dir_all(root.join("common_files")).unwrap();
    fs::write(root.join("common_files/bstate.xyz"), "1\nNa\nNa 0.0 0.0 0.0\n").unwrap();
    for n_iter in 1..=n_iters {
        for seg_id in 0..n_segs {
            let dir = root.join(format!("traj_segs/{:06}/{:06}", n_iter, seg_id));
            write_state(&dir.join("parent.xml"), &[frame_position(n_iter, seg_id, 0)]);
            write_state(&dir.join("seg.xml"), &[frame_position(n_iter, seg_id, 1)]);
        }
    }
}

pub fn config_for(root: &Path) -> Configuration {
    let mut config = Configuration::default();
    config.paths.sim_root = root.to_str().unwrap().to_owned();
    config.paths.topology = String::from("common_files/bstate.xyz");
    config.paths.crawl_h5 = path_string(&root.join("augment_data.h5"));
    config.paths.dest_h5 = path_string(&root.join("west_augmented.h5"));
    config
}

pub fn path_string(path: &Path) -> String {
    path.to_str().unwrap().to_owned()
}

/// Writes a crawl file stamped with `iter_start..iter_stop` that contains the given iterations.
pub fn write_crawl_h5(path: &Path, iter_start: u64, iter_stop: u64, iterations: &[u64]) {
    let mut crawler = Crawler::new(path, DATASET_NAME, ITER_PREC, WriteSettings::default());
    crawler.initialize(iter_start, iter_stop).unwrap();
    for n_iter in iterations.iter() {
        crawler.process_iter_result(*n_iter, &iteration_data(*n_iter)).unwrap();
    }
    crawler.finalize().unwrap();
}

pub fn iteration_data(n_iter: u64) -> Array4<f64> {
    Array::from_shape_fn((2, 2, 1, 3), |(s, f, _, d)| {
        n_iter as f64 + 0.1 * s as f64 + 0.01 * f as f64 + 0.001 * d as f64
    })
}

pub fn coord_path(n_iter: u64) -> String {
    format!("{}/{}/{}", iter_group_name(n_iter, ITER_PREC), AUXDATA_GROUP, DATASET_NAME)
}

pub fn dest_path(root: &Path) -> PathBuf {
    root.join("west_augmented.h5")
}
