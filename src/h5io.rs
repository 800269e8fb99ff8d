//! Layout conventions of weighted ensemble data files and the small set of HDF5
//! operations shared by the crawler and the augmenter.
use crate::defaults::*;
use crate::io::H5Config;
use anyhow::{bail, Context, Result};
use hdf5::filters::ScaleOffset;
use hdf5::{Dataset, File, Group};
use log::debug;
use ndarray::{ArrayD, ArrayView, Dimension};
use std::mem;

/// Name of the group that holds iteration `n_iter`, e.g. `iterations/iter_00000012`.
pub fn iter_group_name(n_iter: u64, iter_prec: usize) -> String {
    format!(
        "{}/iter_{:0prec$}",
        ITERATIONS_GROUP,
        n_iter,
        prec = iter_prec
    )
}

/// Opens the group at `path` below `parent` and creates every missing component
/// on the way. Existing groups are reused.
pub fn ensure_group(parent: &Group, path: &str) -> Result<Group> {
    let mut group: Group = parent.clone();
    for name in path.split('/').filter(|name| !name.is_empty()) {
        group = if group.link_exists(name) {
            group
                .group(name)
                .with_context(|| format!("'{}' in {} is not a group", name, path))?
        } else {
            group.create_group(name)?
        };
    }
    Ok(group)
}

pub fn require_iter_group(file: &File, n_iter: u64, iter_prec: usize) -> Result<Group> {
    ensure_group(file, &iter_group_name(n_iter, iter_prec))
}

/// Stores the iteration range covered by a file as root attributes.
pub fn stamp_iter_range(file: &File, iter_start: u64, iter_stop: u64) -> Result<()> {
    file.new_attr::<i64>()
        .create(ITER_START_ATTR)?
        .write_scalar(&(iter_start as i64))?;
    file.new_attr::<i64>()
        .create(ITER_STOP_ATTR)?
        .write_scalar(&(iter_stop as i64))?;
    Ok(())
}

/// Reads the range stamped by [stamp_iter_range].
pub fn read_iter_range(file: &File) -> Result<(u64, u64)> {
    let start: u64 = read_u64_attr(file, ITER_START_ATTR)?;
    let stop: u64 = read_u64_attr(file, ITER_STOP_ATTR)?;
    Ok((start, stop))
}

/// The iteration the simulation is currently working on, which is also the
/// default exclusive end of a crawl.
pub fn current_iteration(file: &File) -> Result<u64> {
    read_u64_attr(file, CURRENT_ITERATION_ATTR)
}

pub fn read_u64_attr(group: &Group, name: &str) -> Result<u64> {
    let value: i64 = group
        .attr(name)
        .with_context(|| format!("missing attribute '{}'", name))?
        .read_scalar::<i64>()
        .with_context(|| format!("attribute '{}' is not an integer scalar", name))?;
    if value < 0 {
        bail!("attribute '{}' is negative ({})", name, value);
    }
    Ok(value as u64)
}

/// Number of segments of an iteration, given by the length of its segment index.
pub fn segment_count(iter_group: &Group) -> Result<usize> {
    let seg_index: Dataset = iter_group
        .dataset(SEG_INDEX)
        .with_context(|| format!("{} has no {} dataset", iter_group.name(), SEG_INDEX))?;
    match seg_index.shape().first() {
        Some(n_segs) => Ok(*n_segs),
        None => bail!("{} of {} is a scalar", SEG_INDEX, iter_group.name()),
    }
}

/// Chunk shape for an array that is mostly read along its leading dimensions:
/// the leading dimension is halved until the chunk fits into `max_chunksize` bytes
/// or cannot be halved any more, then the next one, and so on.
pub fn calc_chunksize(shape: &[usize], itemsize: usize, max_chunksize: usize) -> Vec<usize> {
    let mut chunk: Vec<usize> = shape.iter().map(|n| (*n).max(1)).collect();
    let nbytes = |chunk: &[usize]| chunk.iter().product::<usize>() * itemsize;
    for idim in 0..chunk.len() {
        while chunk[idim] > 1 && nbytes(&chunk) > max_chunksize {
            chunk[idim] >>= 1;
        }
        if nbytes(&chunk) <= max_chunksize {
            break;
        }
    }
    chunk
}

/// Filter settings of the coordinate datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSettings {
    /// deflate level
    pub compression: u8,
    /// decimal digits kept by the scale-offset filter
    pub scale_offset: u8,
    pub max_chunksize: usize,
}

impl Default for WriteSettings {
    fn default() -> Self {
        WriteSettings {
            compression: COMPRESSION,
            scale_offset: SCALE_OFFSET,
            max_chunksize: MAX_CHUNKSIZE,
        }
    }
}

impl From<&H5Config> for WriteSettings {
    fn from(config: &H5Config) -> Self {
        WriteSettings {
            compression: config.compression,
            scale_offset: config.scale_offset,
            max_chunksize: config.max_chunksize,
        }
    }
}

/// Writes `data` as a new dataset `name` in `group`. If no chunk shape is given it is
/// computed with [calc_chunksize]. Empty arrays are stored unfiltered since filters
/// need a chunked layout and chunks cannot have zero extent. Arrays that contain NaN
/// (frames missing on disk) skip the scale-offset filter, which cannot represent NaN,
/// and are only deflated.
pub fn write_array<D: Dimension>(
    group: &Group,
    name: &str,
    data: ArrayView<f64, D>,
    settings: &WriteSettings,
    chunk: Option<&[usize]>,
) -> Result<Dataset> {
    if group.link_exists(name) {
        bail!("{}/{} already exists", group.name(), name);
    }
    if data.is_empty() {
        let dataset = group
            .new_dataset::<f64>()
            .shape(data.shape().to_vec())
            .create(name)?;
        return Ok(dataset);
    }
    let chunk: Vec<usize> = match chunk {
        Some(chunk) => chunk.to_vec(),
        None => calc_chunksize(data.shape(), mem::size_of::<f64>(), settings.max_chunksize),
    };
    let has_nan: bool = data.iter().any(|x| x.is_nan());
    let builder = group.new_dataset_builder().with_data(data).chunk(chunk);
    let builder = if has_nan {
        debug!("{}/{} contains NaN, scale-offset is not applied", group.name(), name);
        builder
    } else {
        builder.scale_offset(ScaleOffset::FloatDScale(settings.scale_offset))
    };
    let dataset = builder
        .deflate(settings.compression)
        .create(name)
        .with_context(|| format!("unable to write {}/{}", group.name(), name))?;
    Ok(dataset)
}

/// Copies `source` into a new dataset `name` of `target` with the chunk shape and the
/// filter pipeline of the source, so the stored values are identical.
pub fn copy_dataset(source: &Dataset, target: &Group, name: &str) -> Result<Dataset> {
    if target.link_exists(name) {
        bail!("{}/{} already exists", target.name(), name);
    }
    let data: ArrayD<f64> = source.read_dyn::<f64>()?;
    if data.is_empty() {
        let dataset = target
            .new_dataset::<f64>()
            .shape(data.shape().to_vec())
            .create(name)?;
        return Ok(dataset);
    }
    let builder = target.new_dataset_builder().with_data(data.view());
    let builder = match source.chunk() {
        Some(chunk) => builder.chunk(chunk).set_filters(&source.filters()),
        None => builder,
    };
    let dataset = builder
        .create(name)
        .with_context(|| format!("unable to copy {} to {}/{}", source.name(), target.name(), name))?;
    Ok(dataset)
}
