//! Server-rendered HTML for the dashboard.

use std::path::Path;
use tracing::warn;

use super::client::RemoteModelInfo;
use super::history::HistoryEntry;
use crate::config::ArtifactConfig;
use crate::storage;
use crate::types::{EvaluationDocument, MetricsDocument, WellInput};

/// Result of the last form submission.
#[derive(Debug, Clone)]
pub enum PredictionOutcome {
    Success { input: WellInput, predicted_npv: f64 },
    Error(String),
}

/// Local pipeline outputs shown beside the form. Each is optional.
#[derive(Debug, Clone, Default)]
pub struct LocalDocuments {
    pub metrics: Option<MetricsDocument>,
    pub evaluation: Option<EvaluationDocument>,
    pub config_text: Option<String>,
}

impl LocalDocuments {
    /// Read whatever is present. Unreadable files are logged and treated as absent.
    pub fn load(artifacts: &ArtifactConfig, config_path: Option<&Path>) -> Self {
        let metrics = storage::read_json_opt(&artifacts.metrics_path).unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring unreadable metrics document");
            None
        });
        let evaluation = storage::read_json_opt(&artifacts.evaluation_path).unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring unreadable evaluation document");
            None
        });
        let config_text = config_path.and_then(|p| std::fs::read_to_string(p).ok());
        Self {
            metrics,
            evaluation,
            config_text,
        }
    }
}

/// Everything one page render needs.
pub struct PageModel<'a> {
    pub api_url: &'a str,
    pub api_healthy: bool,
    pub model_info: Option<&'a RemoteModelInfo>,
    pub form: &'a WellInput,
    pub trajectory_types: &'a [String],
    pub outcome: Option<&'a PredictionOutcome>,
    pub history: &'a [HistoryEntry],
    pub local: &'a LocalDocuments,
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// `1234567.891` -> `1,234,567.89`
pub fn format_money(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}

/// Initial form values.
pub fn default_input() -> WellInput {
    WellInput {
        heff: 10.0,
        perm: 100.0,
        sg: 0.8,
        l_hor: 500.0,
        gs: "S-TYPE".to_string(),
        temp: 20.0,
        c5: 0.5,
        grp: 1,
        n_gs: 2,
    }
}

/// Preset inputs behind the "Example" links. Unknown numbers give defaults.
pub fn example_input(n: u8) -> WellInput {
    match n {
        1 => WellInput {
            heff: 15.0,
            perm: 150.0,
            sg: 0.75,
            l_hor: 600.0,
            gs: "S-TYPE".to_string(),
            temp: 25.0,
            c5: 0.6,
            grp: 2,
            n_gs: 3,
        },
        2 => WellInput {
            heff: 8.5,
            perm: 60.0,
            sg: 0.65,
            l_hor: 1200.0,
            gs: "U-TYPE".to_string(),
            temp: 15.0,
            c5: 0.3,
            grp: 6,
            n_gs: 1,
        },
        _ => default_input(),
    }
}

const STYLE: &str = "\
body{font-family:system-ui,sans-serif;margin:0;display:flex;color:#222}\
aside{width:300px;background:#f4f5f7;padding:1rem;min-height:100vh}\
main{flex:1;padding:1rem 2rem}\
fieldset{border:1px solid #ccc;margin-bottom:1rem}\
label{display:block;margin:.4rem 0}\
input,select{width:100%;padding:.3rem}\
.ok{color:#1b7f3b}.err{color:#b3261e}\
.result{font-size:1.6rem;padding:1rem;background:#e7f5ec;border-radius:6px}\
.error{padding:1rem;background:#fdecea;border-radius:6px}\
table{border-collapse:collapse;width:100%}td,th{border:1px solid #ddd;padding:.25rem .5rem;text-align:right}\
pre{background:#f4f5f7;padding:.5rem;overflow:auto}\
.muted{color:#777}";

fn number_field(html: &mut String, label: &str, name: &str, value: String, attrs: &str) {
    html.push_str(&format!(
        "<label>{label} <input type=\"number\" name=\"{name}\" value=\"{value}\" {attrs} required></label>"
    ));
}

fn render_sidebar(html: &mut String, page: &PageModel<'_>) {
    html.push_str("<aside><h3>API</h3>");
    html.push_str(&format!("<p class=\"muted\">{}</p>", escape_html(page.api_url)));
    if page.api_healthy {
        html.push_str("<p class=\"ok\">API available</p>");
    } else {
        html.push_str("<p class=\"err\">API unavailable</p>");
    }

    html.push_str("<h3>Model</h3>");
    match page.model_info {
        Some(info) => {
            html.push_str(&format!(
                "<p><b>Type:</b> {}</p><p><b>Features:</b> {}</p><details><summary>Feature list</summary><ul>",
                escape_html(&info.model_type),
                info.n_features
            ));
            for f in &info.features {
                html.push_str(&format!("<li>{}</li>", escape_html(f)));
            }
            html.push_str("</ul></details>");
        }
        None => html.push_str("<p class=\"muted\">Model information unavailable</p>"),
    }

    html.push_str(
        "<h3>Examples</h3><p><a href=\"/?example=1\">Load example 1</a></p>\
         <p><a href=\"/?example=2\">Load example 2</a></p>",
    );

    html.push_str("<h3>Configuration</h3>");
    match &page.local.config_text {
        Some(text) => html.push_str(&format!(
            "<details><summary>params.toml</summary><pre>{}</pre></details>",
            escape_html(text)
        )),
        None => html.push_str("<p class=\"muted\">Configuration unavailable</p>"),
    }
    html.push_str("</aside>");
}

fn render_form(html: &mut String, page: &PageModel<'_>) {
    let w = page.form;
    html.push_str("<form method=\"post\" action=\"/predict\"><fieldset><legend>Geological parameters</legend>");
    number_field(html, "Effective thickness (Heff)", "Heff", w.heff.to_string(), "min=\"0\" step=\"any\"");
    number_field(html, "Permeability (Perm)", "Perm", w.perm.to_string(), "min=\"0\" step=\"any\"");
    number_field(html, "Gas saturation (Sg)", "Sg", w.sg.to_string(), "min=\"0\" max=\"1\" step=\"0.01\"");
    number_field(html, "C5+ content (C5)", "C5", w.c5.to_string(), "min=\"0\" step=\"any\"");
    html.push_str("</fieldset><fieldset><legend>Technical parameters</legend>");
    number_field(html, "Horizontal length (L_hor)", "L_hor", w.l_hor.to_string(), "min=\"0\" step=\"any\"");

    html.push_str("<label>Trajectory type (GS) <select name=\"GS\">");
    for t in page.trajectory_types {
        let selected = if *t == w.gs { " selected" } else { "" };
        let t = escape_html(t);
        html.push_str(&format!("<option value=\"{t}\"{selected}>{t}</option>"));
    }
    html.push_str("</select></label>");

    number_field(html, "Decline rate (temp)", "temp", w.temp.to_string(), "min=\"0\" step=\"any\"");
    number_field(html, "Fracturing stages (GRP)", "GRP", w.grp.to_string(), "min=\"0\" step=\"1\"");
    number_field(html, "Horizontal branches (nGS)", "nGS", w.n_gs.to_string(), "min=\"0\" step=\"1\"");
    html.push_str("</fieldset><button type=\"submit\">Calculate NPV</button></form>");
}

fn render_outcome(html: &mut String, outcome: &PredictionOutcome) {
    match outcome {
        PredictionOutcome::Success {
            input,
            predicted_npv,
        } => {
            html.push_str(&format!(
                "<p class=\"result\">Predicted NPV: <b>{}</b></p>",
                format_money(*predicted_npv)
            ));
            let request = serde_json::to_string_pretty(input).unwrap_or_default();
            html.push_str(&format!(
                "<details><summary>Request details</summary><pre>{}</pre></details>",
                escape_html(&request)
            ));
        }
        PredictionOutcome::Error(msg) => {
            html.push_str(&format!("<p class=\"error\">Error: {}</p>", escape_html(msg)));
        }
    }
}

fn render_history(html: &mut String, history: &[HistoryEntry]) {
    html.push_str("<h2>Prediction history</h2>");
    if history.is_empty() {
        html.push_str("<p class=\"muted\">No predictions yet</p>");
        return;
    }
    html.push_str(
        "<table><tr><th>Time</th><th>Heff</th><th>Perm</th><th>Sg</th><th>L_hor</th>\
         <th>GS</th><th>temp</th><th>C5</th><th>GRP</th><th>nGS</th><th>NPV</th></tr>",
    );
    for e in history {
        let w = &e.input;
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            e.timestamp.format("%Y-%m-%d %H:%M:%S"),
            w.heff,
            w.perm,
            w.sg,
            w.l_hor,
            escape_html(&w.gs),
            w.temp,
            w.c5,
            w.grp,
            w.n_gs,
            format_money(e.predicted_npv)
        ));
    }
    html.push_str(
        "</table><form method=\"post\" action=\"/history/clear\"><button type=\"submit\">Clear history</button></form>",
    );
}

fn render_local_documents(html: &mut String, local: &LocalDocuments) {
    html.push_str("<h2>Training metrics</h2>");
    match &local.metrics {
        Some(m) => html.push_str(&format!(
            "<table><tr><th>MAE</th><th>R²</th><th>MAPE</th><th>CV mean ({})</th><th>CV std</th><th>Train</th><th>Test</th></tr>\
             <tr><td>{:.4}</td><td>{:.4}</td><td>{:.4}</td><td>{:.4}</td><td>{:.4}</td><td>{}</td><td>{}</td></tr></table>",
            m.scoring, m.mae, m.r2, m.mape, m.cv_mean, m.cv_std, m.n_train, m.n_test
        )),
        None => html.push_str("<p class=\"muted\">Metrics unavailable</p>"),
    }

    html.push_str("<h2>Evaluation</h2>");
    match &local.evaluation {
        Some(e) => html.push_str(&format!(
            "<table><tr><th>Actual mean</th><th>Predicted mean</th><th>Actual std</th><th>Predicted std</th>\
             <th>Residual mean</th><th>Residual std</th></tr>\
             <tr><td>{:.4}</td><td>{:.4}</td><td>{:.4}</td><td>{:.4}</td><td>{:.4}</td><td>{:.4}</td></tr></table>",
            e.predictions_stats.actual_mean,
            e.predictions_stats.predicted_mean,
            e.predictions_stats.actual_std,
            e.predictions_stats.predicted_std,
            e.residuals_analysis.residuals_mean,
            e.residuals_analysis.residuals_std
        )),
        None => html.push_str("<p class=\"muted\">Evaluation unavailable</p>"),
    }
}

/// Render the full dashboard page.
pub fn render_page(page: &PageModel<'_>) -> String {
    let mut html = String::with_capacity(8 * 1024);
    html.push_str("<!doctype html><html><head><meta charset=\"utf-8\"><title>NPV Prediction</title><style>");
    html.push_str(STYLE);
    html.push_str("</style></head><body>");

    render_sidebar(&mut html, page);

    html.push_str("<main><h1>NPV Prediction</h1><p class=\"muted\">Net present value forecast from well parameters</p>");
    render_form(&mut html, page);
    if let Some(outcome) = page.outcome {
        render_outcome(&mut html, outcome);
    }
    render_history(&mut html, page.history);
    render_local_documents(&mut html, page.local);
    html.push_str("</main></body></html>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(1234567.891), "1,234,567.89");
        assert_eq!(format_money(-999.5), "-999.50");
        assert_eq!(format_money(0.0), "0.00");
    }

    #[test]
    fn test_examples_are_valid_inputs() {
        for n in 0..=2 {
            assert!(example_input(n).validate().is_empty());
        }
    }

    #[test]
    fn test_missing_documents_render_unavailable() {
        let local = LocalDocuments::default();
        let form = default_input();
        let types = vec!["S-TYPE".to_string(), "<script>".to_string()];
        let page = PageModel {
            api_url: "http://localhost:8000",
            api_healthy: false,
            model_info: None,
            form: &form,
            trajectory_types: &types,
            outcome: None,
            history: &[],
            local: &local,
        };
        let html = render_page(&page);
        assert!(html.contains("Metrics unavailable"));
        assert!(html.contains("Evaluation unavailable"));
        assert!(html.contains("Configuration unavailable"));
        assert!(html.contains("API unavailable"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_error_outcome_is_escaped() {
        let mut html = String::new();
        render_outcome(&mut html, &PredictionOutcome::Error("<b>boom</b>".to_string()));
        assert!(html.contains("&lt;b&gt;boom"));
    }
}
