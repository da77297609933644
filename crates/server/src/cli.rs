use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "riskscan-server",
    version,
    about = "Chat message sentiment and risk scanning service"
)]
pub(crate) struct Args {
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    #[arg(long, default_value = "127.0.0.1:5000")]
    pub(crate) listen_addr: String,
    /// Directory for daily rolling JSON logs.
    #[arg(long)]
    pub(crate) log_dir: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    pub(crate) log_to_stderr: bool,
}
