use outpost_core::display::{format_number, format_rate};
use outpost_core::session::Session;
use outpost_core::warehouse::SystemStatus;
use std::fmt::Write;

/// Plain-text status block printed at the end of a run.
pub fn render(session: &Session) -> String {
    let graph = session.graph();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} nodes ({} stalled), {} connections, {} frames",
        graph.node_count(),
        graph.stalled_count(),
        graph.connection_count(),
        session.clock().frames()
    );
    for res in session.ledger().iter() {
        let _ = writeln!(
            out,
            "  {:<10} {:>8} / {:<8} {:>10}",
            res.display_name,
            format_number(res.current()),
            format_number(res.capacity().limit()),
            format_rate(res.rate())
        );
    }
    let status = match session.storage_report().status {
        SystemStatus::Deficit => "deficit",
        SystemStatus::NearCapacity => "near capacity",
        SystemStatus::Nominal => "nominal",
    };
    let _ = writeln!(out, "storage: {status}");
    out
}
