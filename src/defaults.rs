// CONFIGURATION
// config file, read from the working directory unless given on the command line
pub const CONFIG_FILE_NAME: &str = "westaux.toml";
// verbosity of the log output (0 = info, 1 = debug, >1 = trace)
pub const VERBOSE: i8 = 0;

// PATHS
// root directory of the simulation, relative paths below are resolved against it
pub const SIM_ROOT: &str = ".";
// main data file of the weighted ensemble run
pub const SOURCE_H5: &str = "west.h5";
// reference structure that fixes the number of atoms
pub const TOPOLOGY: &str = "common_files/bstate.pdb";
// every segment stores the frame it started from and the frame it ended at
pub const PARENT_TRAJ_TEMPLATE: &str = "traj_segs/{n_iter:06d}/{seg_id:06d}/parent.xml";
pub const CHILD_TRAJ_TEMPLATE: &str = "traj_segs/{n_iter:06d}/{seg_id:06d}/seg.xml";
// output of the crawl and the augmented copy of the main data file,
// both relative to the working directory
pub const CRAWL_H5: &str = "augment_data.h5";
pub const DEST_H5: &str = "west_augmented.h5";

// CRAWL
// first iteration that is processed
pub const ITER_START: u64 = 1;
// number of iterations that are computed in parallel before they are written
pub const BATCH_SIZE: usize = 16;
// size of the thread pool, 0 lets rayon decide
pub const N_WORKERS: usize = 0;
// two frames for each segment: parent and child
pub const N_FRAMES: usize = 2;
pub const N_DIM: usize = 3;

// HDF5 LAYOUT
// zero padding of the iteration number in the group names
pub const ITER_PREC: usize = 8;
pub const ITERATIONS_GROUP: &str = "iterations";
pub const AUXDATA_GROUP: &str = "auxdata";
pub const DATASET_NAME: &str = "coord";
pub const SEG_INDEX: &str = "seg_index";
// root attribute of the main data file that holds the iteration in progress
pub const CURRENT_ITERATION_ATTR: &str = "west_current_iteration";
pub const ITER_START_ATTR: &str = "iter_start";
pub const ITER_STOP_ATTR: &str = "iter_stop";

// HDF5 FILTERS
// deflate level of the coordinate datasets
pub const COMPRESSION: u8 = 4;
// number of decimal digits kept by the scale-offset filter
pub const SCALE_OFFSET: u8 = 6;
// upper limit of a single chunk in bytes
pub const MAX_CHUNKSIZE: usize = 262144;

// UNITS
// serialized OpenMM states store positions in nm
pub const NM_TO_ANGSTROM: f64 = 10.0;
