//! # V'lille Live Map Entry Point
//!
//! Fetches the live station set, styles every station and renders the map,
//! either as an ASCII listing on stdout or as a standalone Leaflet page.
//! With `--watch` the station set is refetched and rendered again on every
//! poll interval until Ctrl-C.

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use simplelog::{ColorChoice, TermLogger, TerminalMode};

use vlille_lib::api::VLilleApi;
use vlille_lib::config::{Config, DEFAULT_CONFIG_PATH};
use vlille_lib::marker::MarkerTheme;
use vlille_lib::renderer::{
    render_locations, render_stations, AsciiRenderer, LeafletPageRenderer, MapRenderer,
};
use vlille_lib::station_config::{LabelLocale, MarkerSize};

/// Live V'lille station availability.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Opt {
    /// Logging level
    #[clap(long, default_value = "info")]
    level: LevelFilter,

    /// Configuration file path
    #[clap(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Marker size (small, medium, large); defaults to the configured size
    #[clap(long)]
    size: Option<MarkerSize>,

    /// Accessibility label language (fr, en)
    #[clap(long, default_value = "fr")]
    locale: LabelLocale,

    /// Write a Leaflet HTML page to this path instead of printing a listing
    #[clap(long)]
    html: Option<PathBuf>,

    /// Also search a place with the geocoder and mark the results
    #[clap(long)]
    search: Option<String>,

    /// Keep refreshing on the configured poll interval
    #[clap(long)]
    watch: bool,
}

struct Session {
    api: VLilleApi,
    theme: MarkerTheme,
    size: MarkerSize,
    locale: LabelLocale,
    renderer: Box<dyn MapRenderer>,
    search: Option<String>,
    html: Option<PathBuf>,
}

impl Session {
    async fn refresh(&mut self) -> anyhow::Result<String> {
        // A fresh set replaces the previous one on every refresh.
        let stations = self.api.stations().await.context("load stations")?;
        let places = match self.search.as_deref() {
            Some(query) => {
                let places = self
                    .api
                    .search_location(query)
                    .await
                    .with_context(|| format!("search {query:?}"))?;
                log::info!("{} places match {query:?}", places.len());
                places
            }
            None => Vec::new(),
        };

        let renderer = self.renderer.as_mut();
        render_stations(renderer, &stations, self.size, &self.theme, self.locale);
        render_locations(renderer, &places);

        Ok(renderer.finish())
    }
}

/// One fetch-and-render round.
trait Poll {
    async fn poll(&mut self) -> anyhow::Result<()>;
}

impl Poll for Session {
    async fn poll(&mut self) -> anyhow::Result<()> {
        let output = self.refresh().await?;
        emit(&output, self.html.as_deref())
    }
}

fn emit(output: &str, html: Option<&Path>) -> anyhow::Result<()> {
    match html {
        Some(path) => {
            fs::write(path, output).with_context(|| format!("write {}", path.display()))?;
            log::info!("map written to {}", path.display());
        }
        None => println!("{output}\n"),
    }
    Ok(())
}

/// Poll on every tick until `shutdown` resolves, even mid-poll.
async fn watch<P: Poll, S: Future>(poller: &mut P, period: Duration, shutdown: S) {
    let mut interval = tokio::time::interval(period);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = interval.tick() => {}
        }

        tokio::select! {
            _ = &mut shutdown => break,
            result = poller.poll() => {
                // A failed poll keeps the loop alive; the next tick tries again.
                if let Err(e) = result {
                    log::error!("refresh failed: {e:#}");
                }
            }
        }
    }

    log::info!("stopping");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();

    TermLogger::init(
        opt.level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .context("init logger")?;

    let config = Config::load_from_path(&opt.config);
    let renderer: Box<dyn MapRenderer> = match opt.html {
        Some(_) => Box::new(LeafletPageRenderer::new("V'lille en direct")),
        None => Box::new(AsciiRenderer::new()),
    };
    let mut session = Session {
        api: VLilleApi::new(&config.api).context("build http client")?,
        theme: config.theme(),
        size: opt.size.unwrap_or(config.marker.size),
        locale: opt.locale,
        renderer,
        search: opt.search,
        html: opt.html,
    };

    if !opt.watch {
        return session.poll().await;
    }

    let period = Duration::from_secs(config.api.poll_interval_secs.max(1));
    log::info!("refreshing every {}s, Ctrl-C to stop", period.as_secs());
    watch(&mut session, period, tokio::signal::ctrl_c()).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts polls; never finishes once `hang_after` polls have run.
    struct FakePoller {
        polls: usize,
        hang_after: usize,
    }

    impl Poll for FakePoller {
        async fn poll(&mut self) -> anyhow::Result<()> {
            self.polls += 1;
            if self.polls > self.hang_after {
                std::future::pending::<()>().await;
            }
            Err(anyhow::anyhow!("feed unavailable"))
        }
    }

    #[tokio::test]
    async fn test_failed_polls_keep_watching() {
        let mut poller = FakePoller {
            polls: 0,
            hang_after: usize::MAX,
        };
        watch(
            &mut poller,
            Duration::from_millis(10),
            tokio::time::sleep(Duration::from_millis(200)),
        )
        .await;

        assert!(poller.polls >= 2, "only {} polls ran", poller.polls);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_a_stuck_poll() {
        let mut poller = FakePoller {
            polls: 0,
            hang_after: 0,
        };
        let stopped = tokio::time::timeout(
            Duration::from_secs(5),
            watch(
                &mut poller,
                Duration::from_secs(60),
                tokio::time::sleep(Duration::from_millis(50)),
            ),
        )
        .await;

        assert!(stopped.is_ok(), "watch did not stop while a poll was pending");
        assert_eq!(poller.polls, 1);
    }
}
