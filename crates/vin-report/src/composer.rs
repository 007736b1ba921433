//! Report Composer
//!
//! Renders a [`VehicleRecord`] as plain text and HTML. Pure: the same record
//! always yields byte-identical output. Unresolved fields are printed with the
//! `unknown` marker, never dropped.

use vin_core::{FieldValue, ReportBody, VehicleRecord};

/// Formats vehicle records into report bodies
pub struct ReportComposer;

impl ReportComposer {
    /// Compose the full report for a record
    pub fn compose(record: &VehicleRecord) -> ReportBody {
        let vin = record.vin().as_str();
        let title = format!("Vehicle report for {vin}");
        let lines = Self::lines(record);

        let mut text = format!("{title}\n\n");
        for (name, value) in &lines {
            text.push_str(&format!("{name}: {value}\n"));
        }

        let mut html = format!(
            "<!DOCTYPE html>\n<html>\n<body>\n<h1>{}</h1>\n<ul>\n",
            escape_html(&title)
        );
        for (name, value) in &lines {
            let class = if value.is_known() { "known" } else { "unknown" };
            html.push_str(&format!(
                "<li class=\"{class}\">{}: {}</li>\n",
                escape_html(name),
                escape_html(value.display())
            ));
        }
        html.push_str("</ul>\n</body>\n</html>\n");

        ReportBody {
            subject: title,
            text,
            html,
        }
    }

    /// Headline fields first, then every attribute in name order
    fn lines(record: &VehicleRecord) -> Vec<(&str, FieldValue)> {
        let mut lines = vec![
            ("vin", FieldValue::Known(record.vin().to_string())),
            ("make", record.make().clone()),
            ("model", record.model().clone()),
            ("year", record.year().clone()),
        ];
        lines.extend(
            record
                .attributes()
                .iter()
                .map(|(name, value)| (name.as_str(), value.clone())),
        );
        lines
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::normalize;
    use vin_core::{DecodedAttributes, Vin};

    fn record(fields: &[(&str, &str)]) -> VehicleRecord {
        let decoded: DecodedAttributes = fields.iter().copied().collect();
        normalize(Vin::parse("1HGCM82633A004352").unwrap(), &decoded).unwrap()
    }

    #[test]
    fn test_compose_is_deterministic() {
        let r = record(&[
            ("make", "Honda"),
            ("model", "Civic"),
            ("year", "2020"),
            ("Trim", "EX"),
            ("BodyClass", "Sedan"),
        ]);
        assert_eq!(ReportComposer::compose(&r), ReportComposer::compose(&r.clone()));
    }

    #[test]
    fn test_missing_year_rendered_unknown() {
        let body = ReportComposer::compose(&record(&[("make", "Honda"), ("model", "Civic")]));
        assert!(body.text.contains("year: unknown\n"));
        assert!(body.html.contains("<li class=\"unknown\">year: unknown</li>"));
        assert!(!body.text.contains("year: \n"));
    }

    #[test]
    fn test_every_attribute_rendered() {
        let body = ReportComposer::compose(&record(&[
            ("make", "Honda"),
            ("model", "Civic"),
            ("year", "2020"),
            ("EngineCylinders", "4"),
            ("ABS", ""),
        ]));
        assert!(body.text.starts_with("Vehicle report for 1HGCM82633A004352\n\n"));
        assert!(body.text.contains("vin: 1HGCM82633A004352\n"));
        assert!(body.text.contains("make: Honda\n"));
        assert!(body.text.contains("EngineCylinders: 4\n"));
        assert!(body.text.contains("ABS: unknown\n"));
        assert_eq!(body.subject, "Vehicle report for 1HGCM82633A004352");

        let make_at = body.text.find("make:").unwrap();
        let abs_at = body.text.find("ABS:").unwrap();
        assert!(make_at < abs_at);
    }

    #[test]
    fn test_html_is_escaped() {
        let body = ReportComposer::compose(&record(&[
            ("make", "<script>alert(1)</script>"),
            ("Note", "A & B"),
        ]));
        assert!(!body.html.contains("<script>"));
        assert!(body.html.contains("make: &lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(body.html.contains("Note: A &amp; B"));
    }
}
