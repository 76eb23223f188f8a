//! Plain-text rendering of a planned route.

use std::fmt::Write;

use vfr_core::{PlannedRoute, SegmentKind};

fn kind_label(kind: SegmentKind) -> &'static str {
    match kind {
        SegmentKind::Climb => "climb",
        SegmentKind::Cruise => "cruise",
        SegmentKind::Descent => "descent",
    }
}

/// Render `route` as a human readable itinerary.
pub fn format_itinerary(route: &PlannedRoute) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Route: {}", route.route.join(" -> "));
    let _ = writeln!(
        out,
        "Distance: {:.1} nm | Time: {:.2} h | Graph route: {}{}",
        route.distance_nm,
        route.time_hr,
        if route.used_graph_route { "yes" } else { "no (direct)" },
        if route.detour_capped { " | detour cap reached" } else { "" }
    );
    if !route.overflown_airports.is_empty() {
        let _ = writeln!(out, "Diversions:");
        for (ident, name) in route.overflown_airports.iter().zip(&route.overflown_names) {
            let _ = writeln!(out, "  {:<8} {}", ident, name);
        }
    }
    let _ = writeln!(out, "Legs:");
    for (idx, segment) in route.segments.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {:>2}. {:<8} {:>6.1} nm  min {:>5} ft  ({:.4}, {:.4}) -> ({:.4}, {:.4})",
            idx + 1,
            kind_label(segment.kind),
            segment.distance_nm,
            segment.vfr_altitude_ft,
            segment.start.lat,
            segment.start.lon,
            segment.end.lat,
            segment.end.lon
        );
    }
    out
}
