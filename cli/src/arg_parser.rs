use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// Talk to a blueprint conversion server
#[derive(Debug, Parser)]
pub struct ArgParser {
    /// Base URL of the server, e.g. http://localhost:5000
    #[clap(short = 's', long = "server", env = "FORGE_SERVER")]
    pub server: String,
    /// The sub-command to use
    #[clap(subcommand)]
    pub sub_command: SubCommand,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Subcommand)]
pub enum SubCommand {
    /// submit a blueprint image for conversion
    Submit {
        /// path to the blueprint image
        file: PathBuf,
    },
    /// get a job's status
    Status {
        /// Uuid v4 string
        job_id: Uuid,
    },
    /// cancel a job
    Cancel {
        /// Uuid v4 string
        job_id: Uuid,
    },
    /// wait for a job to finish, then save the model
    Download {
        /// Uuid v4 string
        job_id: Uuid,

        /// where to write the model file
        #[clap(long, default_value = "model.glb")]
        out: PathBuf,
    },
}
