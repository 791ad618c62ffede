//! End-to-end tests for the GE2D work-queue engine running on the simulated
//! accelerator.

#[cfg(test)]
mod support;

#[cfg(test)]
mod dispatch_e2e;

#[cfg(test)]
mod lifecycle_e2e;

#[cfg(test)]
mod status_ndjson;
