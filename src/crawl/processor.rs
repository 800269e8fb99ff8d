use crate::defaults::{N_DIM, N_FRAMES};
use crate::h5io::segment_count;
use crate::io::{read_frame_positions, read_topology, Configuration, PathTemplate, Topology};
use anyhow::{bail, Context, Result};
use hdf5::Group;
use log::{debug, info};
use ndarray::prelude::*;
use std::path::{Path, PathBuf};

/// Collects the coordinates of the parent and the child frame of every segment
/// of an iteration. The processor is immutable after construction and can be
/// shared between worker threads.
#[derive(Debug, Clone)]
pub struct IterationProcessor {
    n_atoms: usize,
    parent_traj: PathTemplate,
    child_traj: PathTemplate,
}

impl IterationProcessor {
    /// Loads the topology once to fix the number of atoms of every frame.
    pub fn new(config: &Configuration) -> Result<Self> {
        let topology_path: PathBuf = config.topology();
        debug!("Loading topology from {}", topology_path.display());
        let topology: Topology = read_topology(&topology_path)
            .with_context(|| format!("unable to load topology {}", topology_path.display()))?;
        info!("{: <25} {}", "number of atoms:", topology.n_atoms());
        Ok(Self::with_n_atoms(
            topology.n_atoms(),
            config.parent_template()?,
            config.child_template()?,
        ))
    }

    pub fn with_n_atoms(n_atoms: usize, parent_traj: PathTemplate, child_traj: PathTemplate) -> Self {
        IterationProcessor {
            n_atoms,
            parent_traj,
            child_traj,
        }
    }

    pub fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    /// Shape of the array of a single frame.
    pub fn frame_dim(&self) -> (usize, usize) {
        (self.n_atoms, N_DIM)
    }

    /// Processes iteration `n_iter` of the main data file. The number of segments is
    /// taken from the segment index in `iter_group`.
    pub fn process_iteration(&self, n_iter: u64, iter_group: &Group) -> Result<Array4<f64>> {
        let n_segs: usize = segment_count(iter_group)?;
        self.process_segments(n_iter, n_segs)
    }

    /// Returns an array of shape (n_segs, 2, n_atoms, 3): segment, frame (parent/child),
    /// atom and cartesian component. Frames that do not exist on disk are filled with NaN,
    /// every other read error is returned.
    pub fn process_segments(&self, n_iter: u64, n_segs: usize) -> Result<Array4<f64>> {
        let mut data: Array4<f64> = Array4::zeros((n_segs, N_FRAMES, self.n_atoms, N_DIM));

        for (iseg, mut segment) in data.outer_iter_mut().enumerate() {
            let templates: [&PathTemplate; N_FRAMES] = [&self.parent_traj, &self.child_traj];
            for (mut frame, template) in segment.outer_iter_mut().zip(templates.iter()) {
                let traj_path: PathBuf = template.render(n_iter, iseg);
                frame.assign(&self.load_frame(&traj_path)?);
            }
        }
        Ok(data)
    }

    fn load_frame(&self, path: &Path) -> Result<Array2<f64>> {
        match read_frame_positions(path) {
            Ok(positions) => {
                if positions.dim() != self.frame_dim() {
                    bail!(
                        "{} contains {} atoms, the topology has {}",
                        path.display(),
                        positions.nrows(),
                        self.n_atoms
                    );
                }
                Ok(positions)
            }
            Err(err) if err.is_not_found() => {
                debug!("{}, storing NaN", err);
                Ok(Array2::from_elem(self.frame_dim(), f64::NAN))
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_state(path: &Path, positions: &[[f64; 3]]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut text = String::from("<State>\n<Positions>\n");
        for p in positions.iter() {
            text.push_str(&format!("<Position x=\"{}\" y=\"{}\" z=\"{}\"/>\n", p[0], p[1], p[2]));
        }
        text.push_str("</Positions>\n</State>\n");
        fs::write(path, text).unwrap();
    }

    fn processor(root: &Path, n_atoms: usize) -> IterationProcessor {
        let root = root.to_str().unwrap();
        IterationProcessor::with_n_atoms(
            n_atoms,
            PathTemplate::parse(&format!("{}/{{n_iter:06d}}/{{seg_id:06d}}/parent.xml", root)).unwrap(),
            PathTemplate::parse(&format!("{}/{{n_iter:06d}}/{{seg_id:06d}}/seg.xml", root)).unwrap(),
        )
    }

    #[test]
    fn result_has_one_slot_per_segment_frame_and_atom() {
        let dir = tempfile::tempdir().unwrap();
        let data = processor(dir.path(), 4).process_segments(1, 5).unwrap();
        assert_eq!(data.dim(), (5, 2, 4, 3));
    }

    #[test]
    fn missing_frames_are_nan() {
        let dir = tempfile::tempdir().unwrap();
        let data = processor(dir.path(), 2).process_segments(3, 2).unwrap();
        assert!(data.iter().all(|x| x.is_nan()));
    }

    #[test]
    fn existing_frames_are_copied_in_angstrom() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        // segment 0 is complete, segment 1 lacks its child frame
        write_state(&dir.path().join("000002/000000/parent.xml"), &[[0.1, 0.2, 0.3]]);
        write_state(&dir.path().join("000002/000000/seg.xml"), &[[0.4, 0.5, 0.6]]);
        write_state(&dir.path().join("000002/000001/parent.xml"), &[[1.0, 1.0, 1.0]]);

        let data = processor(dir.path(), 1).process_segments(2, 2).unwrap();
        assert!(data.slice(s![0, .., .., ..]).iter().all(|x| !x.is_nan()));
        assert!((data[[0, 0, 0, 2]] - 3.0).abs() < 1e-12);
        assert!((data[[0, 1, 0, 0]] - 4.0).abs() < 1e-12);
        assert!(data.slice(s![1, 0, .., ..]).iter().all(|x| (x - 10.0).abs() < 1e-12));
        assert!(data.slice(s![1, 1, .., ..]).iter().all(|x| x.is_nan()));
    }

    #[test]
    fn wrong_atom_count_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_state(&dir.path().join("000001/000000/parent.xml"), &[[0.0, 0.0, 0.0]]);
        assert!(processor(dir.path(), 2).process_segments(1, 1).is_err());
    }

    #[test]
    fn unreadable_frames_abort() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("000001/000000/parent.xml");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "<State><Positions>").unwrap();
        assert!(processor(dir.path(), 1).process_segments(1, 1).is_err());
    }

    #[test]
    fn iterations_without_segments_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let data = processor(dir.path(), 3).process_segments(1, 0).unwrap();
        assert_eq!(data.dim(), (0, 2, 3, 3));
    }
}
