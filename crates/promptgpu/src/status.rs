/// Window title: what is rendering, plus the headline of the standing error.
pub fn window_title(app: &str, rendering: &str, error: Option<&str>) -> String {
    let mut title = if rendering.is_empty() {
        app.to_string()
    } else {
        format!("{app}: {rendering}")
    };
    if let Some(error) = error {
        title.push_str(" [error: ");
        title.push_str(headline(error));
        title.push(']');
    }
    title
}

/// Line to print when the standing error changed since it was last shown.
pub fn error_notice(shown: Option<&str>, current: Option<&str>) -> Option<String> {
    if shown == current {
        return None;
    }
    match current {
        Some(error) => Some(format!(
            "error: {} (:error for details, :dismiss to hide)",
            headline(error)
        )),
        None => Some("error cleared".to_string()),
    }
}

fn headline(error: &str) -> &str {
    error.lines().next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_carries_error_headline() {
        assert_eq!(window_title("PromptGPU", "Plasma", None), "PromptGPU: Plasma");
        assert_eq!(
            window_title("PromptGPU", "Plasma", Some("Line 3: bad\nLine 4: worse")),
            "PromptGPU: Plasma [error: Line 3: bad]"
        );
        assert_eq!(window_title("PromptGPU", "", None), "PromptGPU");
    }

    #[test]
    fn dismissing_reports_cleared_once() {
        let first = error_notice(None, Some("Line 3: bad")).expect("new error announced");
        assert!(first.starts_with("error: Line 3: bad"));
        assert_eq!(error_notice(Some("Line 3: bad"), Some("Line 3: bad")), None);
        assert_eq!(
            error_notice(Some("Line 3: bad"), None).as_deref(),
            Some("error cleared")
        );
        assert_eq!(error_notice(None, None), None);
    }

    #[test]
    fn newer_error_replaces_older_one() {
        let notice = error_notice(Some("Line 3: bad"), Some("Line 9: expected `;`"))
            .expect("replacement announced");
        assert!(notice.contains("Line 9: expected `;`"));
        assert!(!notice.contains("Line 3"));
    }
}
