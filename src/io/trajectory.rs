use crate::defaults::{NM_TO_ANGSTROM, N_DIM};
use chemfiles::{Frame, Trajectory};
use ndarray::Array2;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrajectoryError {
    #[error("trajectory file {0} does not exist")]
    NotFound(PathBuf),
    #[error("unable to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed XML in {path}")]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },
    #[error("{path}: {msg}")]
    Format { path: PathBuf, msg: String },
    #[error("chemfiles could not read {path}")]
    Chemfiles {
        path: PathBuf,
        #[source]
        source: chemfiles::Error,
    },
}

impl TrajectoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TrajectoryError::NotFound(_))
    }
}

/// Reference structure of the simulated system. Only the atoms matter here,
/// the positions of the reference are not used.
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    pub names: Vec<String>,
}

impl Topology {
    pub fn n_atoms(&self) -> usize {
        self.names.len()
    }
}

/// Reads the first frame of a structure file in any format known to chemfiles.
pub fn read_topology(path: &Path) -> Result<Topology, TrajectoryError> {
    let frame: Frame = read_chemfiles_frame(path)?;
    let names: Vec<String> = frame.iter_atoms().map(|atom| atom.name()).collect();
    Ok(Topology { names })
}

/// Loads the coordinates of a single frame in Angstrom, shape `(n_atoms, 3)`.
/// Serialized OpenMM states (`.xml`) are parsed directly, everything else is
/// handed to chemfiles. If the file contains several frames only the first one is used.
pub fn read_frame_positions(path: &Path) -> Result<Array2<f64>, TrajectoryError> {
    match path.extension().and_then(OsStr::to_str) {
        Some(ext) if ext.eq_ignore_ascii_case("xml") => read_openmm_state(path),
        _ => {
            let frame: Frame = read_chemfiles_frame(path)?;
            frame_to_positions(&frame, path)
        }
    }
}

fn read_chemfiles_frame(path: &Path) -> Result<Frame, TrajectoryError> {
    // chemfiles reports every failure with the same error type, so a missing
    // file has to be detected before the trajectory is opened
    if !path.exists() {
        return Err(TrajectoryError::NotFound(path.to_path_buf()));
    }
    let chemfiles_err = |source: chemfiles::Error| TrajectoryError::Chemfiles {
        path: path.to_path_buf(),
        source,
    };
    let mut trajectory: Trajectory = Trajectory::open(path, 'r').map_err(chemfiles_err)?;
    let mut frame = Frame::new();
    trajectory.read(&mut frame).map_err(chemfiles_err)?;
    Ok(frame)
}

fn frame_to_positions(frame: &Frame, path: &Path) -> Result<Array2<f64>, TrajectoryError> {
    Array2::from_shape_vec(
        (frame.size(), N_DIM),
        frame
            .positions()
            .iter()
            .flat_map(|array| array.iter())
            .cloned()
            .collect(),
    )
    .map_err(|err| TrajectoryError::Format {
        path: path.to_path_buf(),
        msg: err.to_string(),
    })
}

/// Parses `State/Positions/Position` elements of a serialized OpenMM state.
fn read_openmm_state(path: &Path) -> Result<Array2<f64>, TrajectoryError> {
    let text: String = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            TrajectoryError::NotFound(path.to_path_buf())
        } else {
            TrajectoryError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    parse_openmm_state(&text, path)
}

fn parse_openmm_state(text: &str, path: &Path) -> Result<Array2<f64>, TrajectoryError> {
    let format_err = |msg: String| TrajectoryError::Format {
        path: path.to_path_buf(),
        msg,
    };
    let doc = roxmltree::Document::parse(text).map_err(|source| TrajectoryError::Xml {
        path: path.to_path_buf(),
        source,
    })?;
    let positions_node = doc
        .descendants()
        .find(|node| node.has_tag_name("Positions"))
        .ok_or_else(|| format_err(String::from("no <Positions> element")))?;

    let mut flat: Vec<f64> = Vec::new();
    for (idx, node) in positions_node
        .children()
        .filter(|node| node.has_tag_name("Position"))
        .enumerate()
    {
        for axis in ["x", "y", "z"].iter() {
            let value: &str = node.attribute(*axis).ok_or_else(|| {
                format_err(format!("<Position> {} has no '{}' attribute", idx, axis))
            })?;
            let value: f64 = value.trim().parse().map_err(|_| {
                format_err(format!("<Position> {}: '{}' is not a number", idx, value))
            })?;
            flat.push(value * NM_TO_ANGSTROM);
        }
    }
    let n_atoms: usize = flat.len() / N_DIM;
    Array2::from_shape_vec((n_atoms, N_DIM), flat).map_err(|err| format_err(err.to_string()))
}
