//! The binary modproxy-srv.

use modproxy_srv::*;

#[derive(clap::Parser, Debug)]
#[command(version)]
pub struct Args {
    /// By default modproxy-srv runs in "testing" configuration with much
    /// lighter resource usage settings, listening on an ephemeral
    /// localhost port.
    ///
    /// To setup the server to be ready to use most of the resources
    /// available on a single given machine, you can set this "production"
    /// mode.
    #[arg(long)]
    pub production: bool,

    /// Address to listen on. May be given more than once, replacing the
    /// addresses of the chosen mode.
    #[arg(long)]
    pub listen: Vec<std::net::SocketAddr>,

    /// Path to a json file with component configuration.
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,

    /// Path to a filter file.
    #[arg(long)]
    pub filter_file: Option<std::path::PathBuf>,

    /// Base url of the upstream server to fetch missing modules from.
    #[arg(long)]
    pub upstream: Option<String>,

    /// Base url of the proxy to redirect direct modules to.
    #[arg(long)]
    pub direct_proxy: Option<String>,
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::INFO.into())
                .from_env_lossy(),
        )
        .try_init();

    let args = <Args as clap::Parser>::parse();

    let mut config = if args.production {
        Config::production()
    } else {
        Config::testing()
    };

    if !args.listen.is_empty() {
        config.listen_address_list = args.listen.clone();
    }
    if let Some(path) = &args.config {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(err) => {
                eprintln!("failed to read config {path:?}: {err}");
                std::process::exit(1);
            }
        };
        config.proxy = match modproxy_api::Config::from_json(&json) {
            Ok(proxy) => proxy,
            Err(err) => {
                eprintln!("{err}");
                std::process::exit(1);
            }
        };
    }
    config.filter_file = args.filter_file.clone();
    config.upstream_url = args.upstream.clone();
    config.direct_proxy_url = args.direct_proxy.clone();

    println!("{args:?}--{config:?}");

    let (send, recv) = std::sync::mpsc::channel();

    if let Err(err) = ctrlc::set_handler(move || {
        let _ = send.send(());
    }) {
        eprintln!("failed to set ctrl-c handler: {err}");
        std::process::exit(1);
    }

    let srv = match ProxySrv::new(config) {
        Ok(srv) => srv,
        Err(err) => {
            eprintln!("failed to start server: {err}");
            std::process::exit(1);
        }
    };
    srv.print_addrs();

    let _ = recv.recv();

    println!("Terminating...");
    drop(srv);
    println!("Done.");
    std::process::exit(0);
}
