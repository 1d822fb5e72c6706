//! module proxy http server types.

use crate::{upstream::config::UpstreamProxyModConfig, *};
use modproxy_api::{builder::Builder, BoxFut};
use modproxy_core::filter::Filter;
use std::sync::Arc;

/// Print out a message if this thread dies.
struct ThreadGuard(&'static str);

impl Drop for ThreadGuard {
    fn drop(&mut self) {
        tracing::debug!("{}", self.0);
    }
}

/// A running module proxy server instance.
///
/// The server owns its own tokio runtime on a dedicated thread, so it can
/// be started and stopped from synchronous code.
pub struct ProxySrv {
    t_join: Option<std::thread::JoinHandle<()>>,
    addrs: Vec<std::net::SocketAddr>,
    shutdown: Option<tokio::sync::watch::Sender<()>>,
}

impl Drop for ProxySrv {
    fn drop(&mut self) {
        let _g = ThreadGuard("Server Shutdown Complete!");

        tracing::debug!("begin server shutdown...");
        self.shutdown();
    }
}

impl ProxySrv {
    /// Construct a new ProxySrv instance with the default components.
    pub fn new(config: Config) -> std::io::Result<Self> {
        let mut builder = modproxy_core::default_builder();
        if config.upstream_url.is_some() {
            builder.upstream = UpstreamProxyFactory::create();
        }
        Self::with_builder(config, builder)
    }

    /// Construct a new ProxySrv instance with the components of
    /// `builder`. The builder's config is replaced by `config.proxy`.
    pub fn with_builder(
        config: Config,
        builder: Builder,
    ) -> std::io::Result<Self> {
        let filter = match &config.filter_file {
            Some(filter_file) => {
                let text = std::fs::read_to_string(filter_file)?;
                Filter::parse(&text).map_err(std::io::Error::other)?
            }
            None => Filter::new(),
        };

        let (s_ready, r_ready) = tokio::sync::oneshot::channel();
        let (s_shutdown, r_shutdown) = tokio::sync::watch::channel(());

        let t_join = std::thread::spawn(move || {
            tokio_thread(config, builder, filter, s_ready, r_shutdown)
        });

        match r_ready.blocking_recv() {
            Ok(Ok(addrs)) => {
                tracing::info!(?addrs, "Listening");
                Ok(Self {
                    t_join: Some(t_join),
                    addrs,
                    shutdown: Some(s_shutdown),
                })
            }
            Ok(Err(err)) => {
                let _ = t_join.join();
                Err(err)
            }
            Err(_) => Err(std::io::Error::other("failed to start server")),
        }
    }

    /// Shutdown the server, waiting for in-flight requests to complete.
    pub fn shutdown(&mut self) {
        drop(self.shutdown.take());
        if let Some(t_join) = self.t_join.take() {
            if t_join.join().is_err() {
                tracing::error!("server thread panicked");
            }
        }
    }

    /// Get the bound listening addresses of this server.
    pub fn listen_addrs(&self) -> &[std::net::SocketAddr] {
        self.addrs.as_slice()
    }

    /// Print the address server started on
    pub fn print_addrs(&self) {
        println!("#modproxy_srv#running#");
        for addr in self.addrs.iter() {
            // print these incase someone wants to parse for them
            println!("#modproxy_srv#listening#{addr:?}#");
        }
    }
}

type Ready = std::io::Result<Vec<std::net::SocketAddr>>;

fn tokio_thread(
    config: Config,
    builder: Builder,
    filter: Filter,
    ready: tokio::sync::oneshot::Sender<Ready>,
    shutdown: tokio::sync::watch::Receiver<()>,
) {
    let _g = ThreadGuard("server thread has ended");

    tracing::trace!(?config, "Starting tokio thread");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_thread_count.max(1))
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            let _ = ready.send(Err(err));
            return;
        }
    };

    runtime.block_on(async move {
        let proxy = match build_proxy(&config, builder).await {
            Ok(proxy) => proxy,
            Err(err) => {
                let _ = ready.send(Err(std::io::Error::other(err)));
                return;
            }
        };

        let app = http::router(http::AppState {
            proxy,
            filter: Arc::new(filter),
            direct_proxy_url: config.direct_proxy_url.as_deref().map(Arc::from),
        });

        let mut addrs = Vec::with_capacity(config.listen_address_list.len());
        let mut servers: Vec<BoxFut<'static, std::io::Result<()>>> =
            Vec::with_capacity(config.listen_address_list.len());

        for addr in config.listen_address_list.iter() {
            tracing::info!("Binding to: {}", addr);

            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => listener,
                Err(err) => {
                    let _ = ready.send(Err(err));
                    return;
                }
            };

            match listener.local_addr() {
                Ok(addr) => {
                    tracing::info!("Bound with local address: {}", addr);
                    addrs.push(addr)
                }
                Err(err) => {
                    let _ = ready.send(Err(err));
                    return;
                }
            }

            let mut shutdown = shutdown.clone();
            let server = axum::serve(listener, app.clone())
                .with_graceful_shutdown(async move {
                    // resolves once the sender is dropped
                    while shutdown.changed().await.is_ok() {}
                });
            servers.push(Box::pin(std::future::IntoFuture::into_future(
                server,
            )));
        }

        tracing::info!("Sending ready signal");

        if ready.send(Ok(addrs)).is_err() {
            return;
        }

        for res in futures::future::join_all(servers).await {
            if let Err(err) = res {
                tracing::error!(?err, "server ended with error");
            }
        }
    });
}

/// Wire up the proxy components described by `config`.
async fn build_proxy(
    config: &Config,
    mut builder: Builder,
) -> modproxy_api::ProxyResult<modproxy_api::Proxy> {
    builder.config = config.proxy.clone();
    if builder.config.is_empty() {
        builder.set_default_config()?;
    }

    if let Some(url) = &config.upstream_url {
        let mut upstream: UpstreamProxyModConfig =
            builder.config.get_module_config()?;
        upstream.upstream_proxy.url = url.clone();
        builder.config.update_module_config(&upstream)?;
    }

    builder.build().await
}
