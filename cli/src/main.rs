mod arg_parser;
mod client_cli;

use arg_parser::{ArgParser, SubCommand};
use clap::Parser;
use client_cli::ClientCli;
use std::error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn error::Error>> {
    let args = ArgParser::parse();
    let client = ClientCli::new(&args.server);

    match args.sub_command {
        SubCommand::Submit { file } => client.submit(&file).await?,
        SubCommand::Status { job_id } => client.status(job_id).await?,
        SubCommand::Cancel { job_id } => client.cancel(job_id).await?,
        SubCommand::Download { job_id, out } => client.download(job_id, &out).await?,
    }

    Ok(())
}
