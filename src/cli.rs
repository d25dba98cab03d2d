// Command grammar. Decoding process arguments into these types is the
// whole job of this module; resolving a decoded command into a backend
// call lives in `commands`.

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "beagle", version, about = "Command-line client for the beagle workflow service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Register, inspect and remove files
    Files {
        #[command(subcommand)]
        action: FilesAction,
    },
    /// Storage backends
    Storage {
        #[command(subcommand)]
        action: StorageAction,
    },
    /// File type registry
    FileTypes {
        #[command(subcommand)]
        action: FileTypesAction,
    },
    /// File groups
    FileGroup {
        #[command(subcommand)]
        action: FileGroupAction,
    },
    /// Pipeline runs and operator requests
    Run {
        #[command(subcommand)]
        action: RunAction,
    },
    /// ETL jobs
    Etl {
        #[command(subcommand)]
        action: EtlAction,
    },
    /// Request imports from the sample database
    ImportRequests {
        #[command(subcommand)]
        action: ImportRequestsAction,
    },
    /// Submit tempo normal/tumor pairing generation
    TempoMpgen {
        #[arg(long = "normals-override")]
        normals_override: Vec<String>,
        #[arg(long = "tumors-override")]
        tumors_override: Vec<String>,
    },
    /// Link access run outputs into the working directory
    Access {
        #[command(subcommand)]
        action: AccessAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum FilesAction {
    /// List registered files
    List {
        #[arg(long, default_value_t = 100)]
        page_size: u32,
        /// Filter by metadata, given as key:value
        #[arg(long)]
        metadata: Vec<String>,
        #[arg(long = "file-group")]
        file_group: Vec<String>,
        #[arg(long = "file-type")]
        file_type: Vec<String>,
        #[arg(long)]
        path: Vec<String>,
        #[arg(long = "file-name")]
        file_name: Vec<String>,
    },
    /// Register a new file
    Create {
        #[arg(long)]
        path: String,
        #[arg(long = "file-type")]
        file_type: String,
        #[arg(long = "file-group")]
        file_group: String,
        #[arg(long)]
        size: Option<u64>,
        /// Metadata, given as key:value, may repeat
        #[arg(long)]
        metadata: Vec<String>,
    },
    /// Replace a file record
    Update {
        file_id: String,
        #[arg(long)]
        path: String,
        #[arg(long = "file-type")]
        file_type: String,
        #[arg(long = "file-group")]
        file_group: String,
        #[arg(long)]
        size: Option<u64>,
        #[arg(long)]
        metadata: Vec<String>,
    },
    /// Update selected fields of a file record
    Patch {
        file_id: String,
        #[arg(long)]
        path: Option<String>,
        #[arg(long = "file-type")]
        file_type: Option<String>,
        #[arg(long = "file-group")]
        file_group: Option<String>,
        #[arg(long)]
        size: Option<u64>,
        #[arg(long)]
        metadata: Vec<String>,
    },
    /// Delete files by id, reporting the outcome per id
    Delete {
        #[arg(long = "file-id", required = true)]
        file_id: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum StorageAction {
    List {
        #[arg(long, default_value_t = 100)]
        page_size: u32,
    },
    Create {
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum FileTypesAction {
    List {
        #[arg(long, default_value_t = 100)]
        page_size: u32,
    },
    Create {
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum FileGroupAction {
    List {
        #[arg(long, default_value_t = 100)]
        page_size: u32,
    },
    Create {
        name: String,
        storage: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum RunAction {
    /// List runs
    List {
        #[arg(long, default_value_t = 100)]
        page_size: u32,
        #[arg(long = "request-id")]
        request_id: Vec<String>,
        /// Filter by tags, given as key:value
        #[arg(long)]
        tags: Vec<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long = "job-group")]
        job_group: Vec<String>,
    },
    /// Fetch one run
    Get {
        run_id: String,
    },
    /// Ask an operator to start runs for the given requests
    SubmitRequest {
        #[arg(long)]
        pipeline: String,
        #[arg(long = "request-id")]
        request_id: Vec<String>,
        #[arg(long = "job-group-id")]
        job_group_id: Option<String>,
        /// Start one run per sample (true) or one run for the whole
        /// request (false)
        #[arg(long = "for-each", action = ArgAction::Set, default_value_t = true)]
        for_each: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum EtlAction {
    List {
        #[arg(long, default_value_t = 100)]
        page_size: u32,
        #[arg(long = "request-id")]
        request_id: Vec<String>,
        #[arg(long = "job-group")]
        job_group: Vec<String>,
    },
    Get {
        job_id: String,
    },
    Delete {
        #[arg(long = "job-id", required = true)]
        job_id: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ImportRequestsAction {
    List {
        #[arg(long, default_value_t = 100)]
        page_size: u32,
        #[arg(long = "request-id")]
        request_id: Vec<String>,
    },
    Create {
        #[arg(long = "request-id", required = true)]
        request_id: Vec<String>,
        #[arg(long, action = ArgAction::Set, default_value_t = false)]
        redelivery: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum AccessAction {
    /// Symlink run output directories under Project_<request-id>/bam_qc
    Link {
        #[arg(long = "request-id")]
        request_id: Option<String>,
        #[arg(long = "sample-id")]
        sample_id: Option<String>,
        #[arg(long = "dir-version")]
        dir_version: Option<String>,
    },
    /// Symlink bam/bai outputs into per-patient sample directories
    LinkBams {
        #[arg(long = "request-id")]
        request_id: Option<String>,
        #[arg(long = "sample-id")]
        sample_id: Option<String>,
        #[arg(long = "dir-version")]
        dir_version: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn for_each_defaults_to_true_and_parses_explicitly() {
        let cli = parse(&["beagle", "run", "submit-request", "--pipeline", "access"]);
        match cli.command {
            Command::Run {
                action: RunAction::SubmitRequest { for_each, .. },
            } => assert!(for_each),
            other => panic!("unexpected command {:?}", other),
        }

        let cli = parse(&[
            "beagle",
            "run",
            "submit-request",
            "--pipeline",
            "access",
            "--for-each",
            "false",
        ]);
        match cli.command {
            Command::Run {
                action: RunAction::SubmitRequest { for_each, .. },
            } => assert!(!for_each),
            other => panic!("unexpected command {:?}", other),
        }

        // A non-boolean value is a decode error, not a silent default.
        assert!(Cli::try_parse_from([
            "beagle",
            "run",
            "submit-request",
            "--pipeline",
            "access",
            "--for-each",
            "maybe",
        ])
        .is_err());
    }

    #[test]
    fn repeated_identifiers_accumulate() {
        let cli = parse(&[
            "beagle", "files", "delete", "--file-id", "a", "--file-id", "b", "--file-id", "c",
        ]);
        match cli.command {
            Command::Files {
                action: FilesAction::Delete { file_id },
            } => assert_eq!(file_id, vec!["a", "b", "c"]),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn delete_requires_at_least_one_identifier() {
        assert!(Cli::try_parse_from(["beagle", "files", "delete"]).is_err());
    }

    #[test]
    fn kebab_case_verbs_decode() {
        parse(&["beagle", "file-types", "list"]);
        parse(&["beagle", "import-requests", "create", "--request-id", "09324_C"]);
        parse(&["beagle", "tempo-mpgen", "--normals-override", "s1"]);
        parse(&["beagle", "access", "link-bams", "--request-id", "09324_C"]);
    }
}
