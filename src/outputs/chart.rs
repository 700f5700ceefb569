//! Bar chart of per-article polarity, written as SVG.
//!
//! One bar per article in input order, each in its own colour with a legend
//! entry carrying the article title. The y axis is fixed to `[-1, 1]` so
//! charts from different runs compare directly.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::error::Error;
use std::io::Cursor;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

pub const CHART_TITLE: &str = "Article Sentiment";

const PALETTE: [&str; 10] = [
    "#636efa", "#ef553b", "#00cc96", "#ab63fa", "#ffa15a", "#19d3f3", "#ff6692", "#b6e880",
    "#ff97ff", "#fecb52",
];

const MARGIN_LEFT: f64 = 70.0;
const MARGIN_TOP: f64 = 60.0;
const PLOT_HEIGHT: f64 = 320.0;
const BAR_WIDTH: f64 = 36.0;
const BAR_GAP: f64 = 18.0;
const LEGEND_WIDTH: f64 = 360.0;
const LEGEND_ROW: f64 = 20.0;
const Y_TICKS: [f64; 5] = [-1.0, -0.5, 0.0, 0.5, 1.0];

type SvgWriter = Writer<Cursor<Vec<u8>>>;

/// Render `(title, polarity)` pairs as an SVG document.
pub fn render_bar_chart(series: &[(String, f64)]) -> Result<String, Box<dyn Error>> {
    let n = series.len() as f64;
    let plot_width = (n * (BAR_WIDTH + BAR_GAP) + BAR_GAP).max(200.0);
    let legend_height = MARGIN_TOP + n * LEGEND_ROW + 20.0;
    let width = MARGIN_LEFT + plot_width + LEGEND_WIDTH;
    let height = (MARGIN_TOP + PLOT_HEIGHT + 60.0).max(legend_height);
    let zero_y = MARGIN_TOP + PLOT_HEIGHT / 2.0;
    let y_of = |polarity: f64| zero_y - polarity.clamp(-1.0, 1.0) * PLOT_HEIGHT / 2.0;

    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    start(
        &mut writer,
        "svg",
        &[
            ("xmlns", "http://www.w3.org/2000/svg".to_string()),
            ("width", fmt(width)),
            ("height", fmt(height)),
            ("viewBox", format!("0 0 {} {}", fmt(width), fmt(height))),
            ("font-family", "sans-serif".to_string()),
        ],
    )?;
    empty(
        &mut writer,
        "rect",
        &[
            ("width", "100%".to_string()),
            ("height", "100%".to_string()),
            ("fill", "#ffffff".to_string()),
        ],
    )?;
    text(
        &mut writer,
        &[
            ("x", fmt(MARGIN_LEFT)),
            ("y", fmt(MARGIN_TOP / 2.0)),
            ("font-size", "18".to_string()),
        ],
        CHART_TITLE,
    )?;

    // y grid, ticks and axis label
    for tick in Y_TICKS {
        let y = y_of(tick);
        empty(
            &mut writer,
            "line",
            &[
                ("x1", fmt(MARGIN_LEFT)),
                ("x2", fmt(MARGIN_LEFT + plot_width)),
                ("y1", fmt(y)),
                ("y2", fmt(y)),
                ("stroke", if tick == 0.0 { "#444444" } else { "#e5e5e5" }.to_string()),
            ],
        )?;
        text(
            &mut writer,
            &[
                ("x", fmt(MARGIN_LEFT - 8.0)),
                ("y", fmt(y + 4.0)),
                ("font-size", "11".to_string()),
                ("text-anchor", "end".to_string()),
            ],
            &format!("{tick}"),
        )?;
    }
    text(
        &mut writer,
        &[
            ("x", "16".to_string()),
            ("y", fmt(zero_y)),
            ("font-size", "12".to_string()),
            ("transform", format!("rotate(-90 16 {})", fmt(zero_y))),
            ("text-anchor", "middle".to_string()),
        ],
        "polarity",
    )?;
    text(
        &mut writer,
        &[
            ("x", fmt(MARGIN_LEFT + plot_width / 2.0)),
            ("y", fmt(MARGIN_TOP + PLOT_HEIGHT + 40.0)),
            ("font-size", "12".to_string()),
            ("text-anchor", "middle".to_string()),
        ],
        "article",
    )?;

    for (i, (title, polarity)) in series.iter().enumerate() {
        let colour = PALETTE[i % PALETTE.len()];
        let x = MARGIN_LEFT + BAR_GAP + i as f64 * (BAR_WIDTH + BAR_GAP);
        let top = y_of(polarity.max(0.0));
        let bottom = y_of(polarity.min(0.0));

        start(&mut writer, "rect", &[
            ("x", fmt(x)),
            ("y", fmt(top)),
            ("width", fmt(BAR_WIDTH)),
            ("height", fmt(bottom - top)),
            ("fill", colour.to_string()),
        ])?;
        start(&mut writer, "title", &[])?;
        writer.write_event(Event::Text(BytesText::new(&format!("{title}: {polarity:.3}"))))?;
        writer.write_event(Event::End(BytesEnd::new("title")))?;
        writer.write_event(Event::End(BytesEnd::new("rect")))?;

        text(
            &mut writer,
            &[
                ("x", fmt(x + BAR_WIDTH / 2.0)),
                ("y", fmt(MARGIN_TOP + PLOT_HEIGHT + 16.0)),
                ("font-size", "11".to_string()),
                ("text-anchor", "middle".to_string()),
            ],
            &i.to_string(),
        )?;

        let legend_x = MARGIN_LEFT + plot_width + 20.0;
        let legend_y = MARGIN_TOP + i as f64 * LEGEND_ROW;
        empty(&mut writer, "rect", &[
            ("x", fmt(legend_x)),
            ("y", fmt(legend_y)),
            ("width", "12".to_string()),
            ("height", "12".to_string()),
            ("fill", colour.to_string()),
        ])?;
        text(
            &mut writer,
            &[
                ("x", fmt(legend_x + 18.0)),
                ("y", fmt(legend_y + 10.0)),
                ("font-size", "11".to_string()),
            ],
            title,
        )?;
    }

    writer.write_event(Event::End(BytesEnd::new("svg")))?;
    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

/// Render the chart and write it to `path`.
#[instrument(level = "info", skip_all, fields(path = %path.display(), bars = series.len()))]
pub async fn write_bar_chart(series: &[(String, f64)], path: &Path) -> Result<(), Box<dyn Error>> {
    let svg = render_bar_chart(series)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, svg).await?;
    info!("Wrote sentiment chart");
    Ok(())
}

fn fmt(v: f64) -> String {
    format!("{:.1}", v)
}

fn attrs_of<'a>(name: &'a str, attrs: &'a [(&'a str, String)]) -> BytesStart<'a> {
    BytesStart::new(name).with_attributes(attrs.iter().map(|(k, v)| (*k, v.as_str())))
}

fn start(writer: &mut SvgWriter, name: &str, attrs: &[(&str, String)]) -> Result<(), Box<dyn Error>> {
    writer.write_event(Event::Start(attrs_of(name, attrs)))?;
    Ok(())
}

fn empty(writer: &mut SvgWriter, name: &str, attrs: &[(&str, String)]) -> Result<(), Box<dyn Error>> {
    writer.write_event(Event::Empty(attrs_of(name, attrs)))?;
    Ok(())
}

fn text(writer: &mut SvgWriter, attrs: &[(&str, String)], content: &str) -> Result<(), Box<dyn Error>> {
    writer.write_event(Event::Start(attrs_of("text", attrs)))?;
    writer.write_event(Event::Text(BytesText::new(content)))?;
    writer.write_event(Event::End(BytesEnd::new("text")))?;
    Ok(())
}
