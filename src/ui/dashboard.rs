//! Four-table live dashboard: leads, visits, suspicious events, deployments.

use chrono::Local;
use console::style;
use serde_json::Value;
use sitewatch_common::{
    Deployment, Lead, SharedBuffer, SuspiciousEvent, Timestamp, Topic, TopicBuffer, Visit,
};

use super::icons::{CONNECTING, DEPLOYMENTS, LEADS, LIVE, OFFLINE, SUSPICIOUS, VISITS};
use super::table::{Table, cell};
use crate::feed::{ConnectionState, Dispatcher, RouteId};

/// Buffers behind the dashboard tables, newest first.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub leads: SharedBuffer<Value>,
    pub visits: SharedBuffer<Value>,
    pub suspicious: SharedBuffer<Value>,
    pub deployments: SharedBuffer<Value>,
}

impl Dashboard {
    /// Empty dashboard keeping `history` rows per table.
    pub fn new(history: usize) -> Self {
        Self {
            leads: TopicBuffer::bounded(history).shared(),
            visits: TopicBuffer::bounded(history).shared(),
            suspicious: TopicBuffer::bounded(history).shared(),
            deployments: TopicBuffer::bounded(history).shared(),
        }
    }

    /// Route the four known topics into this dashboard's buffers.
    pub fn attach(&self, dispatcher: &mut Dispatcher) -> Vec<RouteId> {
        vec![
            dispatcher.attach_buffer(Topic::Leads, self.leads.clone()),
            dispatcher.attach_buffer(Topic::Visits, self.visits.clone()),
            dispatcher.attach_buffer(Topic::SuspiciousEvents, self.suspicious.clone()),
            dispatcher.attach_buffer(Topic::Deployments, self.deployments.clone()),
        ]
    }

    /// Row counts in table order.
    pub fn counts(&self) -> [usize; 4] {
        [
            len(&self.leads),
            len(&self.visits),
            len(&self.suspicious),
            len(&self.deployments),
        ]
    }

    pub fn render(&self, state: ConnectionState, endpoint: &str) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{}\n{}\n\n",
            style("Microsite Dashboard").bold().underlined(),
            status_line(state, endpoint)
        ));

        section(&mut out, LEADS, "Recent Leads", leads_table(&snapshot(&self.leads)));
        section(&mut out, VISITS, "Recent Visits", visits_table(&snapshot(&self.visits)));
        section(
            &mut out,
            SUSPICIOUS,
            "Suspicious Events",
            suspicious_table(&snapshot(&self.suspicious)),
        );
        section(
            &mut out,
            DEPLOYMENTS,
            "Deployments & GitHub Status",
            deployments_table(&snapshot(&self.deployments)),
        );
        out
    }

    /// Single-line summary for minimal mode.
    pub fn summary(&self, state: ConnectionState) -> String {
        let [leads, visits, suspicious, deployments] = self.counts();
        format!(
            "{}{} | leads {} | visits {} | suspicious {} | deployments {}",
            state_icon(state),
            state,
            leads,
            visits,
            suspicious,
            deployments
        )
    }
}

fn len(buffer: &SharedBuffer<Value>) -> usize {
    buffer.lock().map(|b| b.len()).unwrap_or(0)
}

fn snapshot(buffer: &SharedBuffer<Value>) -> Vec<Value> {
    buffer.lock().map(|b| b.snapshot()).unwrap_or_default()
}

fn section(out: &mut String, icon: console::Emoji<'_, '_>, title: &str, table: Table) {
    out.push_str(&format!("{}{} ({})\n", icon, style(title).bold(), table.len()));
    out.push_str(&table.render());
    out.push('\n');
}

pub fn state_icon(state: ConnectionState) -> console::Emoji<'static, 'static> {
    match state {
        ConnectionState::Open => LIVE,
        ConnectionState::Connecting => CONNECTING,
        ConnectionState::Disconnected | ConnectionState::Closing => OFFLINE,
    }
}

pub fn status_line(state: ConnectionState, endpoint: &str) -> String {
    let label = match state {
        ConnectionState::Open => style(state.to_string()).green(),
        ConnectionState::Connecting => style(state.to_string()).yellow(),
        ConnectionState::Disconnected | ConnectionState::Closing => style(state.to_string()).red(),
    };
    format!("{}{} {}", state_icon(state), label, style(endpoint).dim())
}

/// Local date-time for a producer timestamp, `-` when absent or unparseable.
pub fn format_timestamp(ts: Option<&Timestamp>) -> String {
    ts.and_then(Timestamp::to_datetime)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Decode a buffered payload; rows that don't fit the record type render blank.
fn decode<T: serde::de::DeserializeOwned + Default>(value: &Value) -> T {
    T::deserialize(value).unwrap_or_default()
}

pub fn leads_table(rows: &[Value]) -> Table {
    let mut table = Table::new(vec!["Name", "Email", "Phone", "Domain", "Timestamp"])
        .empty_message("No leads yet");
    for value in rows {
        let lead: Lead = decode(value);
        table.push(vec![
            cell(lead.name.as_deref()),
            cell(lead.email.as_deref()),
            cell(lead.contact_number()),
            cell(lead.project_domain.as_deref()),
            format_timestamp(lead.timestamp.as_ref()),
        ]);
    }
    table
}

pub fn visits_table(rows: &[Value]) -> Table {
    let mut table = Table::new(vec![
        "IP",
        "Browser",
        "OS",
        "Device",
        "Project",
        "Location",
        "Path",
        "Method",
        "Status",
        "Referer",
        "Suspicious",
        "ASN Org",
        "Latitude",
        "Longitude",
        "Area",
        "Timestamp",
    ])
    .empty_message("No visits yet");
    for value in rows {
        let visit: Visit = decode(value);
        let status = visit.status.as_ref().map(|s| match s {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
        let suspicious = if visit.suspicious == Some(true) {
            style("Yes").red().to_string()
        } else {
            "No".to_string()
        };
        table.push(vec![
            cell(visit.ip.as_deref()),
            cell(visit.browser.as_deref()),
            cell(visit.os.as_deref()),
            cell(visit.device.as_deref()),
            cell(visit.project_domain.as_deref()),
            cell(Some(visit.location().as_str())),
            cell(visit.path.as_deref()),
            cell(visit.method.as_deref()),
            cell(status.as_deref()),
            cell(visit.referer.as_deref()),
            suspicious,
            cell(visit.asn_org.as_deref()),
            coordinate(visit.latitude),
            coordinate(visit.longitude),
            cell(visit.area.as_deref()),
            format_timestamp(visit.timestamp.as_ref()),
        ]);
    }
    table
}

fn coordinate(value: Option<f64>) -> String {
    value.map(|v| format!("{:.4}", v)).unwrap_or_else(|| "-".to_string())
}

pub fn suspicious_table(rows: &[Value]) -> Table {
    let mut table = Table::new(vec!["IP", "Reason", "Origin", "Referer", "User Agent", "Timestamp"])
        .empty_message("No suspicious events");
    for value in rows {
        let event: SuspiciousEvent = decode(value);
        table.push(vec![
            cell(event.ip.as_deref()),
            cell(event.reason.as_deref()),
            cell(event.origin.as_deref()),
            cell(event.referer.as_deref()),
            cell(event.user_agent.as_deref()),
            format_timestamp(event.timestamp.as_ref()),
        ]);
    }
    table
}

pub fn deployments_table(rows: &[Value]) -> Table {
    let mut table = Table::new(vec![
        "Domain",
        "Status",
        "Stars",
        "Forks",
        "Watchers",
        "Last Updated",
        "Repo",
        "Timestamp",
    ])
    .empty_message("No deployments yet");
    for value in rows {
        let deployment: Deployment = decode(value);
        let github = deployment.github.unwrap_or_default();
        let count = |n: Option<u64>| n.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());
        table.push(vec![
            cell(deployment.project_domain.as_deref()),
            cell(deployment.status.as_deref()),
            count(github.stars),
            count(github.forks),
            count(github.watchers),
            format_timestamp(github.last_updated.as_ref()),
            cell(github.repo_url.as_deref()),
            format_timestamp(deployment.timestamp.as_ref()),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sitewatch_common::Envelope;

    fn plain(s: &str) -> String {
        console::strip_ansi_codes(s).into_owned()
    }

    #[test]
    fn test_attach_routes_each_topic_to_its_table() {
        let dashboard = Dashboard::new(50);
        let mut dispatcher = Dispatcher::new();
        assert_eq!(dashboard.attach(&mut dispatcher).len(), 4);

        for topic in ["leads", "visits", "suspicious-events", "deployments", "bogus"] {
            let frame = json!({ "topic": topic, "data": { "ip": "10.0.0.1" } }).to_string();
            dispatcher.dispatch(&Envelope::parse(&frame).unwrap());
        }

        assert_eq!(dashboard.counts(), [1, 1, 1, 1]);
    }

    #[test]
    fn test_tables_respect_history_cap() {
        let dashboard = Dashboard::new(3);
        let mut dispatcher = Dispatcher::new();
        dashboard.attach(&mut dispatcher);
        for i in 0..10 {
            dispatcher.dispatch(&Envelope::new(Topic::Leads, json!({ "name": format!("l{}", i) })).unwrap());
        }
        assert_eq!(dashboard.counts()[0], 3);
        let out = plain(&leads_table(&snapshot(&dashboard.leads)).render());
        let first_row = out.lines().nth(1).unwrap();
        assert!(first_row.starts_with("l9"));
    }

    #[test]
    fn test_lead_row_uses_mobile_when_phone_missing() {
        let out = plain(
            &leads_table(&[json!({
                "name": "Asha",
                "mobile": "+91 98000 00000",
                "projectDomain": "a.com"
            })])
            .render(),
        );
        assert!(out.contains("+91 98000 00000"));
        assert!(out.contains("a.com"));
    }

    #[test]
    fn test_visit_row_formats_location_and_flags() {
        let out = plain(
            &visits_table(&[json!({
                "ip": "10.0.0.1",
                "city": "Pune",
                "country": "IN",
                "status": 404,
                "suspicious": true,
                "latitude": 18.52
            })])
            .render(),
        );
        assert!(out.contains("Pune, IN"));
        assert!(out.contains("404"));
        assert!(out.contains("Yes"));
        assert!(out.contains("18.5200"));
    }

    #[test]
    fn test_null_field_keeps_rest_of_visit_row() {
        let out = plain(
            &visits_table(&[json!({
                "ip": "10.0.0.1",
                "city": "Pune",
                "suspicious": null,
                "latitude": "18.52",
                "timestamp": false
            })])
            .render(),
        );
        assert!(out.contains("10.0.0.1"));
        assert!(out.contains("Pune"));
        assert!(out.contains("18.5200"));
        assert!(out.contains("No"));
    }

    #[test]
    fn test_malformed_payload_renders_placeholder_row() {
        let table = deployments_table(&[json!({ "github": "not an object" })]);
        assert_eq!(table.len(), 1);
        assert!(plain(&table.render()).lines().nth(1).unwrap().starts_with('-'));
    }

    #[test]
    fn test_format_timestamp_missing_is_dash() {
        assert_eq!(format_timestamp(None), "-");
        assert_eq!(format_timestamp(Some(&Timestamp::Text("yesterday".into()))), "-");
        assert_ne!(format_timestamp(Some(&Timestamp::Millis(1_700_000_000_000))), "-");
    }

    #[test]
    fn test_summary_counts_rows() {
        let dashboard = Dashboard::new(50);
        dashboard.visits.lock().unwrap().push(json!({}));
        let summary = plain(&dashboard.summary(ConnectionState::Open));
        assert!(summary.contains("open"));
        assert!(summary.contains("visits 1"));
    }

    #[test]
    fn test_render_contains_all_sections() {
        let out = plain(&Dashboard::new(50).render(ConnectionState::Connecting, "ws://localhost:9500/ws"));
        for title in [
            "Recent Leads",
            "Recent Visits",
            "Suspicious Events",
            "Deployments & GitHub Status",
            "connecting",
        ] {
            assert!(out.contains(title), "missing {}", title);
        }
    }
}
