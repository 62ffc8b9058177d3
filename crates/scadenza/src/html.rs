use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::calendar::{self, CalendarCell};
use crate::clock::Clock;
use crate::format;
use crate::picker::DueDatePicker;
use crate::types::{parse_timestamp, Issue};

fn page(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(CSS)) }
            }
            body {
                div.container { (body) }
            }
        }
    }
}

/// Issue list with each issue's due date
pub fn render_index(issues: &[Issue]) -> Markup {
    page(
        "Issues",
        html! {
            h1 { "Issues" }
            div.stats {
                span #"total-count" { (issues.len()) }
                " issues"
            }
            @if issues.is_empty() {
                div.empty-state {
                    p { "No issues yet." }
                }
            } @else {
                ul.issue-list {
                    @for issue in issues {
                        li.issue-item {
                            a href={"/issues/" (issue.id)} { (issue.title) }
                            @match issue.due_at() {
                                Some(at) => {
                                    span.issue-due title=(format::full_stamp(at)) {
                                        (format::due_date_label(at))
                                    }
                                }
                                None => {
                                    span.issue-due.none { "No due date" }
                                }
                            }
                        }
                    }
                }
            }
        },
    )
}

/// Issue detail page: due-date section, creation stamps and, when open, the picker
pub fn render_issue_page(issue: &Issue, picker: &DueDatePicker, clock: &dyn Clock) -> Markup {
    page(
        &issue.title,
        html! {
            a.back href="/" { "All issues" }
            h1 { (issue.title) }
            (render_due_date_section(issue))
            (render_dates(issue))
            @if picker.is_open() {
                (render_picker(issue, picker, clock))
            }
        },
    )
}

fn action(issue: &Issue, name: &str) -> String {
    format!("/issues/{}/due-date/{}", issue.id, name)
}

fn render_due_date_section(issue: &Issue) -> Markup {
    html! {
        section.due-date {
            div.due-date-label { "Due Date" }
            @match format::committed_label(issue.due_date.as_deref()) {
                Some(label) => {
                    div.due-date-value {
                        form method="post" action=(action(issue, "open")) {
                            button.link type="submit" { "📅 " (label) }
                        }
                        form method="post" action=(action(issue, "clear")) {
                            button.clear type="submit" title="Clear due date" { "✕" }
                        }
                    }
                }
                None => {
                    form.no-due-date method="post" action=(action(issue, "open")) {
                        button.link type="submit" { "📅 Set due date" }
                    }
                }
            }
        }
    }
}

fn render_dates(issue: &Issue) -> Markup {
    html! {
        div.dates {
            @if let Ok(created) = parse_timestamp(&issue.created_at) {
                div { "Created at " (format::short_stamp(created)) }
            }
            @if issue.was_updated() {
                @if let Ok(updated) = parse_timestamp(&issue.updated_at) {
                    div { "Updated at " (format::short_stamp(updated)) }
                }
            }
        }
    }
}

fn render_picker(issue: &Issue, picker: &DueDatePicker, clock: &dyn Clock) -> Markup {
    let Some(working) = picker.working() else {
        return html! {};
    };
    let cells = picker.grid(clock).unwrap_or_default();
    let headers = format::weekday_headers(picker.week_start());

    html! {
        div.picker-modal #"due-date-picker" {
            div.picker {
                div.picker-header {
                    h3 { "Set Due Date" }
                    form method="post" action=(action(issue, "cancel")) {
                        button.icon type="submit" title="Close" { "✕" }
                    }
                }
                div.calendar {
                    div.calendar-header {
                        form method="post" action=(action(issue, "prev")) {
                            button.icon type="submit" title="Previous month" { "‹" }
                        }
                        span.month-title { (format::month_title(working)) }
                        form method="post" action=(action(issue, "next")) {
                            button.icon type="submit" title="Next month" { "›" }
                        }
                    }
                    div.weekdays {
                        @for label in headers {
                            div { (label) }
                        }
                    }
                    form.days method="post" action=(action(issue, "select")) {
                        @for week in calendar::weeks(&cells) {
                            @for cell in week {
                                (render_day(cell))
                            }
                        }
                    }
                }
                form.time-section method="post" action=(action(issue, "time")) {
                    h4 { "Time (PST)" }
                    div.time-inputs {
                        select name="hour" {
                            @for h in 0..24u32 {
                                option value=(h) selected[h == chrono::Timelike::hour(&working)] {
                                    (format::two_digits(h))
                                }
                            }
                        }
                        span { ":" }
                        select name="minute" {
                            @for m in 0..60u32 {
                                option value=(m) selected[m == chrono::Timelike::minute(&working)] {
                                    (format::two_digits(m))
                                }
                            }
                        }
                        button.secondary type="submit" { "Apply" }
                    }
                    div.time-display { (format::time_label(working)) }
                }
                div.action-buttons {
                    form method="post" action=(action(issue, "cancel")) {
                        button.secondary type="submit" { "Cancel" }
                    }
                    form method="post" action=(action(issue, "commit")) {
                        button.primary type="submit" { "Set Due Date" }
                    }
                }
            }
        }
    }
}

fn render_day(cell: &CalendarCell) -> Markup {
    html! {
        button.day
            .other-month[!cell.is_current_month]
            .today[cell.is_today]
            .selected[cell.is_selected]
            type="submit"
            name="date"
            value=(cell.date.format("%Y-%m-%d"))
        {
            (chrono::Datelike::day(&cell.date))
        }
    }
}

const CSS: &str = r#"
* {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
}

body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
    background: #f4f5f7;
    color: #172b4d;
    line-height: 1.4;
}

.container {
    max-width: 760px;
    margin: 0 auto;
    padding: 40px 24px 60px;
}

h1 {
    font-size: 1.8em;
    margin-bottom: 16px;
}

.stats, .dates {
    color: #5e6c84;
    font-size: 0.85em;
    margin-bottom: 24px;
}

.dates {
    margin-top: 24px;
}

.back {
    display: inline-block;
    margin-bottom: 16px;
    color: #0052cc;
}

.issue-list {
    list-style: none;
    display: grid;
    gap: 8px;
}

.issue-item {
    display: flex;
    justify-content: space-between;
    padding: 12px 16px;
    background: #fff;
    border: 1px solid #dfe1e6;
    border-radius: 6px;
}

.issue-due.none {
    color: #8993a4;
}

.empty-state {
    padding: 60px 20px;
    text-align: center;
    color: #8993a4;
}

.due-date-label {
    padding-bottom: 12px;
    color: #5e6c84;
    font-size: 13px;
    text-transform: uppercase;
}

.due-date-value, .no-due-date {
    display: flex;
    align-items: center;
    padding: 10px 12px;
    border-radius: 6px;
    background: #fff;
    border: 1px solid #dfe1e6;
}

.no-due-date {
    border: 2px dashed #c1c7d0;
}

button {
    font: inherit;
    cursor: pointer;
    border: none;
    background: none;
}

button.clear {
    margin-left: auto;
    padding: 6px;
    opacity: 0.6;
}

button.clear:hover {
    opacity: 1;
    color: #e5493a;
}

.picker-modal {
    position: fixed;
    inset: 0;
    background: rgba(0, 0, 0, 0.5);
    display: flex;
    align-items: center;
    justify-content: center;
    z-index: 1000;
}

.picker {
    background: #fff;
    border-radius: 12px;
    max-width: 420px;
    width: 90vw;
    overflow: hidden;
    box-shadow: 0 20px 60px rgba(0, 0, 0, 0.2);
}

.picker-header {
    display: flex;
    justify-content: space-between;
    align-items: center;
    padding: 20px 24px;
    background: linear-gradient(135deg, #0052cc 0%, #667eea 100%);
    color: #fff;
}

.picker-header button {
    color: #fff;
}

.calendar {
    padding: 24px;
}

.calendar-header {
    display: flex;
    justify-content: space-between;
    align-items: center;
    margin-bottom: 20px;
    font-size: 18px;
}

.weekdays, .days {
    display: grid;
    grid-template-columns: repeat(7, 1fr);
    gap: 4px;
    text-align: center;
}

.weekdays {
    color: #5e6c84;
    font-size: 12px;
    margin-bottom: 8px;
}

.day {
    padding: 8px 0;
    border-radius: 6px;
}

.day:hover {
    background: #deebff;
}

.day.other-month {
    color: #c1c7d0;
}

.day.today {
    font-weight: 700;
    border: 1px solid #0052cc;
}

.day.selected {
    background: #0052cc;
    color: #fff;
}

.time-section {
    padding: 0 24px 24px;
}

.time-inputs {
    display: flex;
    align-items: center;
    gap: 8px;
    margin: 8px 0;
}

.time-display {
    color: #5e6c84;
}

.action-buttons {
    display: flex;
    justify-content: flex-end;
    gap: 12px;
    padding: 16px 24px;
    border-top: 1px solid #ebecf0;
}

button.primary, button.secondary {
    padding: 8px 16px;
    border-radius: 4px;
}

button.primary {
    background: #0052cc;
    color: #fff;
}

button.secondary {
    background: #ebecf0;
}
"#;
