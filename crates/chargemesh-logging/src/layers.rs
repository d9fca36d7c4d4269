//! Custom tracing layers for ChargeMesh

use tracing::{Subscriber, span};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{
    Layer,
    layer::Context,
    registry::LookupSpan,
};

use crate::config::JsonlConfig;
use crate::context::{NodeContextData, NodeContextGuard};

/// Layer that attaches the active [`NodeContextGuard`] to new spans
#[derive(Debug, Default)]
pub struct NodeContextLayer;

impl NodeContextLayer {
    pub fn new() -> Self {
        Self
    }
}

/// Extension data stored on spans
#[derive(Debug, Clone)]
pub struct NodeContextExtension {
    pub data: NodeContextData,
}

impl<S> Layer<S> for NodeContextLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_new_span(&self, _attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id)
            && let Some(node_ctx) = NodeContextGuard::current()
        {
            span.extensions_mut()
                .insert(NodeContextExtension { data: node_ctx });
        }
    }
}

/// JSONL formatting layer writing to `writer`
pub fn jsonl_layer<S, W>(writer: W, config: &JsonlConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(config.include_spans)
        .flatten_event(config.flatten_events)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_thread_ids(config.include_thread_info)
        .with_thread_names(config.include_thread_info)
        .with_writer(writer)
        .boxed()
}

/// Human-readable console layer
pub fn pretty_layer<S>(ansi: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    tracing_subscriber::fmt::layer()
        .with_ansi(ansi)
        .with_target(true)
        .boxed()
}
