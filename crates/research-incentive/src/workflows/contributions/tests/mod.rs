mod common;
mod suggestions;
mod workflow;
