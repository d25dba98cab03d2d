// Command resolver: maps each decoded command to exactly one dispatcher
// call (endpoint, method, parameter bag) and prints the outcome. List
// actions hand off to the pagination loop afterwards.

use anyhow::Result;
use reqwest::Method;
use serde_json::{json, Map, Value};

use crate::access;
use crate::api::{self, ApiClient};
use crate::cli::{
    AccessAction, Command, EtlAction, FileGroupAction, FileTypesAction, FilesAction,
    ImportRequestsAction, RunAction, StorageAction,
};
use crate::config::endpoints;
use crate::session::SessionStore;
use crate::ui::{self, Prompter};

pub fn run(
    command: Command,
    api: &ApiClient,
    store: &mut SessionStore,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    match command {
        Command::Files { action } => files(action, api, store, prompter),
        Command::Storage { action } => storage(action, api, store, prompter),
        Command::FileTypes { action } => file_types(action, api, store, prompter),
        Command::FileGroup { action } => file_group(action, api, store, prompter),
        Command::Run { action } => runs(action, api, store, prompter),
        Command::Etl { action } => etl(action, api, store, prompter),
        Command::ImportRequests { action } => import_requests(action, api, store, prompter),
        Command::TempoMpgen {
            normals_override,
            tumors_override,
        } => {
            let body = json!({
                "normals_override": normals_override,
                "tumors_override": tumors_override,
            });
            write(api, Method::POST, endpoints::TEMPO_MPGEN, &body)
        }
        Command::Access { action } => access::run(action, api),
    }
}

fn files(
    action: FilesAction,
    api: &ApiClient,
    store: &mut SessionStore,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    match action {
        FilesAction::List {
            page_size,
            metadata,
            file_group,
            file_type,
            path,
            file_name,
        } => {
            let mut query = page_query(page_size);
            repeat(&mut query, "metadata", metadata);
            repeat(&mut query, "file_group", file_group);
            repeat(&mut query, "file_type", file_type);
            repeat(&mut query, "path", path);
            repeat(&mut query, "filename", file_name);
            list(api, store, prompter, endpoints::FILES, query)
        }
        FilesAction::Create {
            path,
            file_type,
            file_group,
            size,
            metadata,
        } => {
            let body = file_body(&path, &file_type, &file_group, size, &metadata)?;
            write(api, Method::POST, endpoints::FILES, &body)
        }
        FilesAction::Update {
            file_id,
            path,
            file_type,
            file_group,
            size,
            metadata,
        } => {
            let body = file_body(&path, &file_type, &file_group, size, &metadata)?;
            write(api, Method::PUT, &item_path(endpoints::FILES, &file_id), &body)
        }
        FilesAction::Patch {
            file_id,
            path,
            file_type,
            file_group,
            size,
            metadata,
        } => {
            let body = file_patch_body(path, file_type, file_group, size, &metadata)?;
            write(api, Method::PATCH, &item_path(endpoints::FILES, &file_id), &body)
        }
        FilesAction::Delete { file_id } => delete(api, endpoints::FILES, &file_id),
    }
}

fn storage(
    action: StorageAction,
    api: &ApiClient,
    store: &mut SessionStore,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    match action {
        StorageAction::List { page_size } => {
            list(api, store, prompter, endpoints::STORAGE, page_query(page_size))
        }
        StorageAction::Create { name } => {
            write(api, Method::POST, endpoints::STORAGE, &json!({ "name": name }))
        }
    }
}

fn file_types(
    action: FileTypesAction,
    api: &ApiClient,
    store: &mut SessionStore,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    match action {
        FileTypesAction::List { page_size } => {
            list(api, store, prompter, endpoints::FILE_TYPES, page_query(page_size))
        }
        FileTypesAction::Create { name } => {
            write(api, Method::POST, endpoints::FILE_TYPES, &json!({ "name": name }))
        }
    }
}

fn file_group(
    action: FileGroupAction,
    api: &ApiClient,
    store: &mut SessionStore,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    match action {
        FileGroupAction::List { page_size } => {
            list(api, store, prompter, endpoints::FILE_GROUPS, page_query(page_size))
        }
        FileGroupAction::Create { name, storage } => write(
            api,
            Method::POST,
            endpoints::FILE_GROUPS,
            &json!({ "name": name, "storage": storage }),
        ),
    }
}

fn runs(
    action: RunAction,
    api: &ApiClient,
    store: &mut SessionStore,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    match action {
        RunAction::List {
            page_size,
            request_id,
            tags,
            status,
            job_group,
        } => {
            let mut query = page_query(page_size);
            repeat(&mut query, "request_ids", request_id);
            repeat(&mut query, "tags", tags);
            if let Some(status) = status {
                query.push(("status".into(), status));
            }
            repeat(&mut query, "job_groups", job_group);
            list(api, store, prompter, endpoints::RUNS, query)
        }
        RunAction::Get { run_id } => show(api, &item_path(endpoints::RUNS, &run_id)),
        RunAction::SubmitRequest {
            pipeline,
            request_id,
            job_group_id,
            for_each,
        } => {
            let mut body = Map::new();
            body.insert("request_ids".into(), json!(request_id));
            body.insert("pipeline".into(), Value::String(pipeline));
            if let Some(job_group_id) = job_group_id {
                body.insert("job_group_id".into(), Value::String(job_group_id));
            }
            body.insert("for_each".into(), Value::Bool(for_each));
            write(api, Method::POST, endpoints::REQUEST_OPERATOR, &Value::Object(body))
        }
    }
}

fn etl(
    action: EtlAction,
    api: &ApiClient,
    store: &mut SessionStore,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    match action {
        EtlAction::List {
            page_size,
            request_id,
            job_group,
        } => {
            let mut query = page_query(page_size);
            repeat(&mut query, "request_id", request_id);
            repeat(&mut query, "job_groups", job_group);
            list(api, store, prompter, endpoints::ETL_JOBS, query)
        }
        EtlAction::Get { job_id } => show(api, &item_path(endpoints::ETL_JOBS, &job_id)),
        EtlAction::Delete { job_id } => delete(api, endpoints::ETL_JOBS, &job_id),
    }
}

fn import_requests(
    action: ImportRequestsAction,
    api: &ApiClient,
    store: &mut SessionStore,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    match action {
        ImportRequestsAction::List {
            page_size,
            request_id,
        } => {
            let mut query = page_query(page_size);
            repeat(&mut query, "request_id", request_id);
            list(api, store, prompter, endpoints::IMPORT_REQUESTS, query)
        }
        ImportRequestsAction::Create {
            request_id,
            redelivery,
        } => {
            let body = json!({ "request_ids": request_id, "redelivery": redelivery });
            write(api, Method::POST, endpoints::IMPORT_REQUESTS, &body)
        }
    }
}

// Dispatch helpers. Backend errors are reported here and never
// propagate past the command; only session-file writes bubble up.

fn list(
    api: &ApiClient,
    store: &mut SessionStore,
    prompter: &mut dyn Prompter,
    endpoint: &str,
    query: Vec<(String, String)>,
) -> Result<()> {
    let spinner = ui::spinner("Fetching results...");
    let page = api.get(endpoint, &query);
    spinner.finish_and_clear();
    match page {
        Ok(page) => {
            println!("{}", api::pretty(&page));
            store.update_cursors(&page)?;
            ui::paginate(api, store, prompter)
        }
        Err(e) => {
            println!("{:#}", e);
            Ok(())
        }
    }
}

fn show(api: &ApiClient, endpoint: &str) -> Result<()> {
    let spinner = ui::spinner("Fetching result...");
    let result = api.get(endpoint, &[]);
    spinner.finish_and_clear();
    match result {
        Ok(value) => println!("{}", api::pretty(&value)),
        Err(e) => println!("{:#}", e),
    }
    Ok(())
}

fn write(api: &ApiClient, method: Method, endpoint: &str, body: &Value) -> Result<()> {
    let spinner = ui::spinner("Contacting the backend...");
    let result = api.send_write(method, endpoint, body);
    spinner.finish_and_clear();
    match result {
        Ok(value) => println!("{}", api::pretty(&value)),
        Err(e) => println!("{:#}", e),
    }
    Ok(())
}

fn delete(api: &ApiClient, endpoint: &str, ids: &[String]) -> Result<()> {
    let spinner = ui::spinner("Deleting...");
    let report = api.delete_each(endpoint, ids);
    spinner.finish_and_clear();
    match report {
        Ok(report) => println!("{}", api::pretty(&report)),
        Err(e) => println!("{:#}", e),
    }
    Ok(())
}

fn item_path(endpoint: &str, id: &str) -> String {
    format!("{}{}/", endpoint, id)
}

fn page_query(page_size: u32) -> Vec<(String, String)> {
    vec![("page_size".into(), page_size.to_string())]
}

fn repeat(query: &mut Vec<(String, String)>, key: &str, values: Vec<String>) {
    for value in values {
        query.push((key.into(), value));
    }
}

fn file_body(
    path: &str,
    file_type: &str,
    file_group: &str,
    size: Option<u64>,
    metadata: &[String],
) -> Result<Value> {
    let mut body = Map::new();
    body.insert("path".into(), Value::String(path.into()));
    body.insert("file_type".into(), Value::String(file_type.into()));
    body.insert("file_group".into(), Value::String(file_group.into()));
    if let Some(size) = size {
        body.insert("size".into(), json!(size));
    }
    body.insert("metadata".into(), Value::Object(api::merge_metadata(metadata)?));
    Ok(Value::Object(body))
}

/// Patch bodies carry only the fields that were actually supplied.
fn file_patch_body(
    path: Option<String>,
    file_type: Option<String>,
    file_group: Option<String>,
    size: Option<u64>,
    metadata: &[String],
) -> Result<Value> {
    let mut body = Map::new();
    if let Some(path) = path {
        body.insert("path".into(), Value::String(path));
    }
    if let Some(file_type) = file_type {
        body.insert("file_type".into(), Value::String(file_type));
    }
    if let Some(file_group) = file_group {
        body.insert("file_group".into(), Value::String(file_group));
    }
    if let Some(size) = size {
        body.insert("size".into(), json!(size));
    }
    if !metadata.is_empty() {
        body.insert("metadata".into(), Value::Object(api::merge_metadata(metadata)?));
    }
    Ok(Value::Object(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_options_become_repeated_query_parameters() {
        let mut query = page_query(50);
        repeat(
            &mut query,
            "metadata",
            vec!["requestId:09324_C".into(), "owner:alice".into()],
        );
        assert_eq!(
            query,
            vec![
                ("page_size".to_string(), "50".to_string()),
                ("metadata".to_string(), "requestId:09324_C".to_string()),
                ("metadata".to_string(), "owner:alice".to_string()),
            ]
        );
    }

    #[test]
    fn file_body_merges_metadata_and_skips_absent_size() {
        let body = file_body(
            "/data/a.bam",
            "bam",
            "fg-1",
            None,
            &["requestId:09324_C".to_string(), "owner:alice".to_string()],
        )
        .unwrap();
        assert_eq!(body["path"], "/data/a.bam");
        assert_eq!(body["metadata"]["requestId"], "09324_C");
        assert_eq!(body["metadata"]["owner"], "alice");
        assert!(body.get("size").is_none());
    }

    #[test]
    fn patch_body_contains_only_supplied_fields() {
        let body = file_patch_body(
            None,
            Some("bam".into()),
            None,
            None,
            &["owner:alice".to_string()],
        )
        .unwrap();
        let fields: Vec<&str> = body.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(fields, vec!["file_type", "metadata"]);
    }

    #[test]
    fn empty_patch_is_an_empty_object() {
        let body = file_patch_body(None, None, None, None, &[]).unwrap();
        assert_eq!(body, json!({}));
    }

    #[test]
    fn item_paths_keep_the_trailing_slash() {
        assert_eq!(item_path(endpoints::FILES, "abc"), "v0/fs/files/abc/");
    }
}
