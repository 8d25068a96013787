//! Human-readable formatting for list output.

use crate::model::{EventFilter, ZoneRef};

/// Short description of where a job's zone comes from.
pub(super) fn describe_zone(zone: &ZoneRef) -> String {
    match zone {
        ZoneRef::Named { name } => name.clone(),
        ZoneRef::Inline {
            lat,
            lon,
            radius_meters,
        } => format!("({lat:.4}, {lon:.4}) r={radius_meters}m"),
    }
}

/// The filter as it was typed on the command line.
pub(super) fn describe_filter(filter: EventFilter) -> &'static str {
    match filter {
        EventFilter::Enter => "enter",
        EventFilter::Exit => "exit",
        EventFilter::Both => "both",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_descriptions() {
        assert_eq!(
            describe_zone(&ZoneRef::Named {
                name: "gym".to_string()
            }),
            "gym"
        );
        assert_eq!(
            describe_zone(&ZoneRef::Inline {
                lat: 40.748,
                lon: -73.985,
                radius_meters: 60.0
            }),
            "(40.7480, -73.9850) r=60m"
        );
    }

    #[test]
    fn filter_descriptions() {
        assert_eq!(describe_filter(EventFilter::Both), "both");
    }
}
