//! End-to-end pipeline tests with scripted collaborators.

mod pipeline_flow;
mod support;
