//! One storm animation, from parameters to uploaded GIF.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tracing::{error, info, instrument};

use grid_processor::{load_and_clip, PartitionOpener};
use renderer::render_animation;
use storage::{ObjectLocation, StorageProvider};
use storm_common::{HourlyRange, StormError, StormResult};
use watershed::load_boundary;

use crate::config::StormConfig;
use crate::params::PluginParams;

/// Result record returned to the plugin runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub gif_s3_location: String,
}

/// Render the storm described by `params` and upload the GIF.
///
/// All intermediate files live in a scratch directory that is removed when
/// this returns, whatever the outcome.
#[instrument(skip_all, fields(start = %params.start_date, hours = params.duration))]
pub async fn run(
    params: &PluginParams,
    config: &StormConfig,
    storage: Arc<dyn StorageProvider>,
) -> StormResult<RunResult> {
    params.validate()?;

    let work_dir = scratch_dir(config)?;
    info!(work_dir = %work_dir.path().display(), "Starting storm animation");

    let window = HourlyRange::parse(&params.start_date, params.duration)?;
    let paths = window.partition_paths(&params.precip_source_location);
    info!(
        from = %window.start,
        to = ?window.end(),
        partitions = paths.len(),
        "Generated partition paths"
    );

    let watershed_file =
        fetch_watershed(&params.watershed_file_location, work_dir.path(), storage.as_ref()).await?;
    let boundary = load_boundary(&watershed_file, config.combine_all)?;
    info!(
        polygons = boundary.polygon_count(),
        bounds = ?boundary.bounds(),
        "Loaded watershed"
    );

    let opener = PartitionOpener::with_provider(storage.clone());
    let dataset = load_and_clip(&paths, Some(&boundary), &config.load, &opener)?;

    let gif = render_animation(
        work_dir.path(),
        &dataset,
        &params.output_name(),
        &boundary,
        &config.render,
    )?;

    let object = params.object_name();
    let location = upload(&gif, &params.output_bucket, &object, storage.as_ref()).await?;
    info!(location = %location, "Storm animation uploaded");

    Ok(RunResult {
        gif_s3_location: location,
    })
}

fn scratch_dir(config: &StormConfig) -> StormResult<TempDir> {
    let dir = match &config.work_root {
        Some(root) => tempfile::Builder::new().prefix("storm-gif-").tempdir_in(root)?,
        None => tempfile::Builder::new().prefix("storm-gif-").tempdir()?,
    };
    Ok(dir)
}

/// Local path of the watershed file, downloading it into `work_dir` first
/// when it lives in object storage.
async fn fetch_watershed(
    location: &str,
    work_dir: &Path,
    storage: &dyn StorageProvider,
) -> StormResult<PathBuf> {
    let Some(remote) = ObjectLocation::parse(location)? else {
        return Ok(PathBuf::from(location));
    };

    let file_name = remote.file_name().ok_or_else(|| {
        StormError::InvalidInput(format!("watershed location '{}' names no file", location))
    })?;
    let dest = work_dir.join(file_name);

    storage
        .bucket(&remote.bucket)?
        .download_to(&remote.key, &dest)
        .await?;
    info!(source = %remote, dest = %dest.display(), "Fetched watershed file");
    Ok(dest)
}

async fn upload(
    gif: &Path,
    bucket: &str,
    object: &str,
    storage: &dyn StorageProvider,
) -> StormResult<String> {
    let destination = format!("s3://{}/{}", bucket, object);

    let result = match storage.bucket(bucket) {
        Ok(client) => client.upload_file(gif, object).await,
        Err(e) => Err(e),
    };

    result.map_err(|e| {
        error!(bucket, object, error = %e, "Failed to upload GIF");
        StormError::upload(destination, e.to_string())
    })
}
