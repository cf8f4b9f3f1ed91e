use crate::def::config;
use std::io::{Error, ErrorKind, Result};
use std::time::Duration;

/// Settings for one listener with its route names resolved.
#[derive(Debug, Clone)]
pub struct ObjectConfig {
    pub listener: config::Listener,
    pub routes: Vec<config::Route>,
    pub default: config::Route,
}

fn find_route(name: &str, cfg: &config::Config) -> Result<config::Route> {
    cfg.route
        .iter()
        .find(|r| r.name == name)
        .cloned()
        .ok_or_else(|| Error::new(ErrorKind::InvalidInput, format!("route {} not found", name)))
}

impl ObjectConfig {
    pub fn build(name: &str, cfg: &config::Config) -> Result<Self> {
        let listener = cfg
            .listener
            .iter()
            .find(|l| l.name == name)
            .cloned()
            .ok_or_else(|| {
                Error::new(ErrorKind::InvalidInput, format!("listener {} not found", name))
            })?;
        let mut routes = Vec::with_capacity(listener.routes.len());
        for route_name in &listener.routes {
            routes.push(find_route(route_name, cfg)?);
        }
        let default = find_route(&listener.default, cfg)?;
        Ok(Self {
            listener,
            routes,
            default,
        })
    }

    pub fn peek(&self) -> usize {
        self.listener.peek.unwrap_or(config::DEFAULT_PEEK).max(1)
    }

    pub fn sniff_timeout(&self) -> Duration {
        Duration::from_millis(
            self.listener
                .sniff_timeout_ms
                .unwrap_or(config::DEFAULT_SNIFF_TIMEOUT_MS),
        )
    }
}
