// Access linking: builds local symlink trees over the outputs of
// completed "access legacy" pipeline runs, so analysts get a stable
// Project_<request>/bam_qc/<version> layout in the working directory.

use anyhow::Result;
use serde_json::Value;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use crate::api::ApiClient;
use crate::cli::AccessAction;
use crate::config::endpoints;

const ACCESS_PIPELINE: &str = "access legacy";

pub fn run(action: AccessAction, api: &ApiClient) -> Result<()> {
    match action {
        AccessAction::Link {
            request_id,
            sample_id,
            dir_version,
        } => link(api, request_id.as_deref(), sample_id.as_deref(), dir_version),
        AccessAction::LinkBams {
            request_id,
            sample_id,
            dir_version,
        } => link_bams(api, request_id.as_deref(), sample_id.as_deref(), dir_version),
    }
}

/// Symlink each completed run's output directory under
/// `Project_<request-id>/bam_qc/<version>/` and point `current` at the
/// version directory.
fn link(
    api: &ApiClient,
    request_id: Option<&str>,
    sample_id: Option<&str>,
    dir_version: Option<String>,
) -> Result<()> {
    let request_id = match request_id {
        Some(request_id) => request_id,
        None => {
            println!("--request-id is required for access link");
            return Ok(());
        }
    };
    let pipeline = match find_pipeline(api)? {
        Some(pipeline) => pipeline,
        None => return Ok(()),
    };
    let version = resolve_version(dir_version, &pipeline);

    let unversioned = Path::new(".")
        .join(format!("Project_{}", request_id))
        .join("bam_qc");
    let versioned = unversioned.join(&version);
    fs::create_dir_all(&versioned)?;

    let runs = completed_runs(api, &run_tag(request_id, sample_id), &pipeline)?;
    if runs.is_empty() {
        return Ok(());
    }

    for meta in &runs {
        let run_id = match meta.get("id").and_then(Value::as_str) {
            Some(run_id) => run_id,
            None => continue,
        };
        let run = api.get(&format!("{}{}/", endpoints::RUNS, run_id), &[])?;
        if let Some(output_dir) = run.get("output_directory").and_then(Value::as_str) {
            let target = versioned.join(run_id);
            if symlink(output_dir, &target).is_err() {
                println!(
                    "could not create symlink from '{}' to '{}'",
                    output_dir,
                    target.display()
                );
            }
        }
    }

    refresh_current_link(&versioned, &unversioned.join("current"));
    Ok(())
}

/// Symlink every bam/bai output of the completed runs into
/// `<patient>/<sample>/<version>/`, keyed off the sample naming scheme
/// embedded in the file names.
fn link_bams(
    api: &ApiClient,
    request_id: Option<&str>,
    sample_id: Option<&str>,
    dir_version: Option<String>,
) -> Result<()> {
    let tag = match (request_id, sample_id) {
        (None, None) => {
            println!("--request-id or --sample-id is required for access link-bams");
            return Ok(());
        }
        (Some(request_id), _) => run_tag(request_id, sample_id),
        (None, Some(sample_id)) => format!("cmoSampleIds:{}", sample_id),
    };
    let pipeline = match find_pipeline(api)? {
        Some(pipeline) => pipeline,
        None => return Ok(()),
    };
    let version = resolve_version(dir_version, &pipeline);

    let mut files = Vec::new();
    for meta in completed_runs(api, &tag, &pipeline)? {
        let run_id = match meta.get("id").and_then(Value::as_str) {
            Some(run_id) => run_id.to_string(),
            None => continue,
        };
        let run = api.get(&format!("{}{}/", endpoints::RUNS, run_id), &[])?;
        if let Some(outputs) = run.get("outputs").and_then(Value::as_array) {
            for port in outputs {
                if let Some(value) = port.get("value") {
                    collect_sample_files(value, sample_id, None, &mut files);
                }
            }
        }
    }

    for (_, file) in &files {
        let location = match file.get("location").and_then(Value::as_str) {
            Some(location) => location,
            None => continue,
        };
        let file_path = location.strip_prefix("file://").unwrap_or(location);
        if !is_linked_extension(file_path) {
            continue;
        }
        let file_name = match Path::new(file_path).file_name().and_then(|n| n.to_str()) {
            Some(file_name) => file_name,
            None => continue,
        };
        let (patient_id, sample) = match patient_sample_dirs(file_name) {
            Some(ids) => ids,
            None => continue,
        };

        let sample_path = PathBuf::from(patient_id).join(sample);
        let versioned = sample_path.join(&version);
        fs::create_dir_all(&versioned)?;

        let target = versioned.join(file_name);
        if symlink(file_path, &target).is_err() {
            println!(
                "could not create symlink from '{}' to '{}'",
                target.display(),
                file_path
            );
            continue;
        }
        refresh_current_link(&versioned, &sample_path.join("current"));
    }
    Ok(())
}

/// First pipeline named "access legacy", or None (reported) when the
/// backend knows no such pipeline.
fn find_pipeline(api: &ApiClient) -> Result<Option<Value>> {
    let page = api.get(
        endpoints::PIPELINES,
        &[("name".to_string(), ACCESS_PIPELINE.to_string())],
    )?;
    let pipeline = page
        .get("results")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .cloned();
    if pipeline.is_none() {
        println!("Pipeline '{}' does not exist", ACCESS_PIPELINE);
    }
    Ok(pipeline)
}

fn resolve_version(dir_version: Option<String>, pipeline: &Value) -> String {
    dir_version.unwrap_or_else(|| {
        pipeline
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string()
    })
}

fn run_tag(request_id: &str, sample_id: Option<&str>) -> String {
    match sample_id {
        Some(sample_id) => format!("cmoSampleIds:{}", sample_id),
        None => format!("requestId:{}", request_id),
    }
}

/// All COMPLETED runs in the job group of the newest completed run for
/// the given tag and pipeline.
fn completed_runs(api: &ApiClient, tag: &str, pipeline: &Value) -> Result<Vec<Value>> {
    let app = pipeline
        .get("id")
        .map(|id| match id {
            Value::String(id) => id.clone(),
            other => other.to_string(),
        })
        .unwrap_or_default();

    let latest = api.get(
        endpoints::RUNS,
        &[
            ("tags".to_string(), tag.to_string()),
            ("status".to_string(), "COMPLETED".to_string()),
            ("page_size".to_string(), "1".to_string()),
            ("apps".to_string(), app.clone()),
        ],
    )?;
    let job_group = latest
        .get("results")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .and_then(|run| run.get("job_group"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let job_group = match job_group {
        Some(job_group) => job_group,
        None => {
            println!("There are no runs for this id");
            return Ok(Vec::new());
        }
    };

    let page = api.get(
        endpoints::RUNS,
        &[
            ("tags".to_string(), tag.to_string()),
            ("status".to_string(), "COMPLETED".to_string()),
            ("page_size".to_string(), "1000".to_string()),
            ("job_groups".to_string(), job_group),
            ("apps".to_string(), app),
        ],
    )?;
    Ok(page
        .get("results")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default())
}

/// Walk an output value tree collecting `(sample_id, file)` pairs.
/// Handles arrays, directory listings (the directory basename becomes
/// the inherited sample id) and port entries that pair a `sampleId`
/// with a `file` object plus its `secondaryFiles`.
fn collect_sample_files(
    node: &Value,
    filter: Option<&str>,
    inherited: Option<&str>,
    out: &mut Vec<(String, Value)>,
) {
    match node {
        Value::Array(items) => {
            for item in items {
                collect_sample_files(item, filter, inherited, out);
            }
        }
        Value::Object(entry) => {
            if let Some(file) = entry.get("file") {
                let entry_sample = entry.get("sampleId").and_then(Value::as_str);
                let is_file = file.get("class").and_then(Value::as_str) == Some("File");
                if let (Some(entry_sample), true) = (entry_sample, is_file) {
                    if filter.map_or(true, |want| want == entry_sample) {
                        push_with_secondaries(entry_sample, file, out);
                    }
                }
            } else {
                match entry.get("class").and_then(Value::as_str) {
                    Some("Directory") => {
                        if let Some(listing) = entry.get("listing") {
                            let dir_sample = entry.get("basename").and_then(Value::as_str);
                            collect_sample_files(listing, filter, dir_sample, out);
                        }
                    }
                    Some("File") => {
                        let sample = inherited.unwrap_or_default();
                        if filter.map_or(true, |want| want == sample) {
                            push_with_secondaries(sample, node, out);
                        }
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    }
}

fn push_with_secondaries(sample: &str, file: &Value, out: &mut Vec<(String, Value)>) {
    out.push((sample.to_string(), file.clone()));
    if let Some(secondaries) = file.get("secondaryFiles").and_then(Value::as_array) {
        for secondary in secondaries {
            out.push((sample.to_string(), secondary.clone()));
        }
    }
}

fn is_linked_extension(path: &str) -> bool {
    matches!(
        Path::new(path).extension().and_then(|e| e.to_str()),
        Some("bam") | Some("bai")
    )
}

/// Derive `(patient, sample)` directory names from a bam file name:
/// `C-0EU9LX-L015-d_cl_aln_srt.bam` links under `C-0EU9LX/C-0EU9LX-L015-d/`.
fn patient_sample_dirs(file_name: &str) -> Option<(String, String)> {
    let sample = file_name.split('_').next()?;
    let mut parts = sample.split('-');
    let site = parts.next()?;
    let patient = parts.next()?;
    parts.next()?;
    Some((format!("{}-{}", site, patient), sample.to_string()))
}

fn refresh_current_link(versioned: &Path, current: &Path) {
    let absolute = match versioned.canonicalize() {
        Ok(absolute) => absolute,
        Err(_) => versioned.to_path_buf(),
    };
    let _ = fs::remove_file(current);
    if symlink(&absolute, current).is_err() {
        println!(
            "could not create symlink from '{}' to '{}'",
            absolute.display(),
            current.display()
        );
    }
}
