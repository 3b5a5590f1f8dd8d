use ::clap::Parser;
use ::std::net::SocketAddr;
use ::std::path::PathBuf;

/// Sits between a game client and its server, relaying traffic and
/// answering `!` commands typed into the client's chat.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Config {
    /// Address the game client connects to
    #[arg(long, default_value = "127.0.0.1:17091")]
    pub listen: SocketAddr,

    /// Address of the real game server
    #[arg(long, default_value = "127.0.0.1:17092")]
    pub upstream: SocketAddr,

    /// Also write logs to a daily rotated file in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Messages longer than this end the session
    #[arg(long, default_value_t = 1024 * 1024)]
    pub max_message_len: usize,
}
