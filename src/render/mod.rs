mod chart;
mod format;
mod page;
mod table;
mod text;
mod url;

pub use chart::{infer_chart, render_chart};
pub use format::{
    format_duration, format_number, format_number_short, format_readable_size, html_escape,
    link_href, percent_encode, render_cell, value_to_string, RenderContext,
};
pub use page::{
    render_alert, render_chart_card, render_chart_grid, render_error_body, render_report, Layout,
};
pub use table::{render_table, TableOptions};
pub use text::{error, print_fetch_error, render_text_table, success, warning};
pub use url::PageUrl;
