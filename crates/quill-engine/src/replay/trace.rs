use super::{Backend2D, Backend3D, Op2D, Op3D};

const TARGET: &str = "quill::replay";

/// One op seen by a [`TraceBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub name: &'static str,
    pub detail: String,
}

/// Backend that logs every op at `trace` and keeps a copy for inspection.
#[derive(Debug, Default)]
pub struct TraceBackend {
    records: Vec<TraceRecord>,
}

impl TraceBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    /// Op names in replay order.
    pub fn names(&self) -> Vec<&'static str> {
        self.records.iter().map(|r| r.name).collect()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    fn record(&mut self, name: &'static str, detail: String) {
        log::trace!(target: TARGET, "{detail}");
        self.records.push(TraceRecord { name, detail });
    }
}

impl Backend2D for TraceBackend {
    fn apply(&mut self, op: Op2D<'_>) -> anyhow::Result<()> {
        self.record(op.name(), op.to_string());
        Ok(())
    }
}

impl Backend3D for TraceBackend {
    fn apply(&mut self, op: Op3D<'_>) -> anyhow::Result<()> {
        self.record(op.name(), op.to_string());
        Ok(())
    }
}
