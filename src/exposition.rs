//! Prometheus text exposition format, version 0.0.4.

use std::fmt::Write;

use crate::types::MetricSample;

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

fn escape_label_value(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

/// Render samples grouped by family. Within a family, samples keep the
/// order they were given in.
pub fn render(samples: &[MetricSample]) -> String {
    let mut ordered: Vec<&MetricSample> = samples.iter().collect();
    ordered.sort_by_key(|s| s.metric);

    let mut out = String::with_capacity(samples.len() * 64);
    let mut current = None;
    for sample in ordered {
        let metric = sample.metric;
        if current != Some(metric) {
            let _ = writeln!(out, "# HELP {} {}", metric.name(), escape_help(metric.help()));
            let _ = writeln!(out, "# TYPE {} {}", metric.name(), metric.kind().as_str());
            current = Some(metric);
        }

        out.push_str(metric.name());
        if !sample.labels.is_empty() {
            out.push('{');
            for (i, label) in sample.labels.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(label.key);
                out.push_str("=\"");
                escape_label_value(&label.value, &mut out);
                out.push('"');
            }
            out.push('}');
        }
        out.push(' ');
        out.push_str(&format_value(sample.value));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Label, MetricId};

    fn sample(metric: MetricId, value: f64, labels: &[(&'static str, &str)]) -> MetricSample {
        MetricSample {
            metric,
            value,
            labels: labels
                .iter()
                .map(|(key, value)| Label {
                    key: *key,
                    value: value.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn groups_families_with_one_header() {
        let samples = vec![
            sample(MetricId::InterfaceRxBytes, 10.0, &[("name", "ether1")]),
            sample(MetricId::Up, 1.0, &[]),
            sample(MetricId::InterfaceRxBytes, 20.0, &[("name", "ether2")]),
        ];
        let text = render(&samples);
        assert_eq!(
            text,
            "# HELP mikrotik_up Was the last scrape of the MikroTik router successful.\n\
             # TYPE mikrotik_up gauge\n\
             mikrotik_up 1\n\
             # HELP mikrotik_interface_receive_bytes_total Total number of bytes received.\n\
             # TYPE mikrotik_interface_receive_bytes_total counter\n\
             mikrotik_interface_receive_bytes_total{name=\"ether1\"} 10\n\
             mikrotik_interface_receive_bytes_total{name=\"ether2\"} 20\n"
        );
    }

    #[test]
    fn escapes_label_values() {
        let samples = vec![sample(
            MetricId::InterfaceInfo,
            1.0,
            &[("name", "ether1"), ("type", "ether"), ("comment", "to \"core\"\\a\nb"), ("mac_address", "")],
        )];
        let text = render(&samples);
        assert!(text.contains(r#"comment="to \"core\"\\a\nb""#));
        assert!(text.contains(r#"mac_address="""#));
    }

    #[test]
    fn special_values() {
        assert_eq!(format_value(0.25), "0.25");
        assert_eq!(format_value(1e6), "1000000");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NAN), "NaN");
    }

    #[test]
    fn empty_input_renders_nothing() {
        assert_eq!(render(&[]), "");
    }
}
