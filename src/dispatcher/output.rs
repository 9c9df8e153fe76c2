use std::sync::Arc;

use tracing::info;

use super::OutputConfigMonitor;
use crate::layout::output_sink_path;
use crate::model::decode;
use crate::MirrorListener;
use crate::MirrorView;
use crate::NodeEvent;
use crate::NodeEventKind;
use crate::OutputSinkProperties;
use crate::Result;

/// Routes updates of `/output/<destination>/<sinkType>` to the monitor
/// registered for that sink.
///
/// Only updates are forwarded. Sinks read their initial properties with
/// `get_output_sink_properties`.
pub struct OutputChangeDispatcher {
    monitors: Vec<(String, Arc<dyn OutputConfigMonitor>)>,
}

impl std::fmt::Debug for OutputChangeDispatcher {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("OutputChangeDispatcher")
            .field(
                "paths",
                &self.monitors.iter().map(|(p, _)| p).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl OutputChangeDispatcher {
    /// Resolves every monitor's sink path up front.
    ///
    /// # Errors
    /// - `InvalidPath` if a monitor reports an unusable destination or type
    pub fn new(monitors: Vec<Arc<dyn OutputConfigMonitor>>) -> Result<Self> {
        let monitors = monitors
            .into_iter()
            .map(|m| Ok((output_sink_path(&m.destination(), &m.output_type())?, m)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { monitors })
    }
}

impl MirrorListener for OutputChangeDispatcher {
    fn on_event(
        &self,
        _view: &MirrorView,
        event: &NodeEvent,
    ) -> Result<()> {
        if event.kind != NodeEventKind::Updated {
            return Ok(());
        }
        info!("Output config updated: {}", event.path);

        let mut matching = self
            .monitors
            .iter()
            .filter(|(path, _)| *path == event.path)
            .peekable();
        if matching.peek().is_none() {
            return Ok(());
        }
        let properties: OutputSinkProperties = decode(&event.path, &event.data)?;
        for (_, monitor) in matching {
            monitor.on_output_config_changed(properties.clone());
        }
        Ok(())
    }
}
