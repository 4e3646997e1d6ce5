//! Command-line interface for Partpix.

use clap::{Parser, Subcommand};

/// Partpix - part photo lookup service
/// Serves part photos over HTTP and indexes the photo share into a catalog
#[derive(Parser)]
#[command(name = "partpix")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service
    #[command(alias = "-s", alias = "--serve")]
    Serve,

    /// Scan the photo root once and refresh the part catalog
    #[command(alias = "reindex")]
    Index,

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}
