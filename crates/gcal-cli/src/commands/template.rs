//! `template` subcommands.

use std::collections::BTreeMap;

use super::{Context, print_json};
use crate::cli::TemplateAction;
use crate::error::{ClientError, ClientResult};
use crate::templates::EventTemplate;

pub fn run(ctx: &Context, action: TemplateAction) -> ClientResult<()> {
    let store = ctx.templates();
    match action {
        TemplateAction::List => {
            let templates = store.list()?;
            if ctx.is_json() {
                let by_name: BTreeMap<_, _> = templates.into_iter().collect();
                return print_json(&by_name);
            }
            if templates.is_empty() {
                println!("No templates. Create one with `google-calendar template save <name>`.");
                return Ok(());
            }
            for (name, template) in &templates {
                println!("  • {} ({} min): {}", name, template.duration_minutes, template.title);
            }
            Ok(())
        }

        TemplateAction::Show { name } => {
            let template = store.get(&name)?;
            if ctx.is_json() {
                return print_json(&template);
            }
            println!("{}", render(&name, &template));
            Ok(())
        }

        TemplateAction::Save {
            name,
            title,
            description,
            location,
            duration,
            attendees,
        } => {
            if duration == 0 {
                return Err(ClientError::validation("--duration must be at least 1 minute"));
            }
            let template = EventTemplate {
                title: title.unwrap_or_default(),
                description: description.unwrap_or_default(),
                location: location.unwrap_or_default(),
                duration_minutes: duration,
                attendees,
            };
            let path = store.save(&name, &template)?;
            println!("Template '{}' saved to {}", name, path.display());
            Ok(())
        }

        TemplateAction::Delete { name } => {
            if store.delete(&name)? {
                println!("Template '{}' deleted.", name);
                Ok(())
            } else {
                Err(ClientError::validation(format!("template '{}' not found", name)))
            }
        }
    }
}

fn render(name: &str, template: &EventTemplate) -> String {
    let mut lines = vec![
        format!("Template: {}", name),
        format!("  Title:     {}", template.title),
        format!("  Duration:  {} min", template.duration_minutes),
    ];
    if !template.description.is_empty() {
        lines.push(format!("  Description: {}", template.description));
    }
    if !template.location.is_empty() {
        lines.push(format!("  Location:  {}", template.location));
    }
    if !template.attendees.is_empty() {
        lines.push(format!("  Attendees: {}", template.attendees.join(", ")));
    }
    let placeholders = template.placeholders();
    if !placeholders.is_empty() {
        lines.push(format!("  Variables: {}", placeholders.join(", ")));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CalendarConfig, ConfigPaths};

    fn context() -> (tempfile::TempDir, Context) {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = Context::new(
            ConfigPaths::new(tmp.path()),
            CalendarConfig::default(),
            "default".into(),
            false,
        );
        (tmp, ctx)
    }

    #[test]
    fn save_show_delete() {
        let (_tmp, ctx) = context();
        run(
            &ctx,
            TemplateAction::Save {
                name: "review".into(),
                title: Some("Review {{project}}".into()),
                description: None,
                location: Some("Room 1".into()),
                duration: 30,
                attendees: vec!["a@example.com".into()],
            },
        )
        .unwrap();

        let saved = ctx.templates().get("review").unwrap();
        assert_eq!(saved.duration_minutes, 30);
        assert_eq!(saved.title, "Review {{project}}");

        run(&ctx, TemplateAction::Show { name: "review".into() }).unwrap();
        run(&ctx, TemplateAction::List).unwrap();
        run(&ctx, TemplateAction::Delete { name: "review".into() }).unwrap();
        assert!(run(&ctx, TemplateAction::Delete { name: "review".into() }).is_err());
    }

    #[test]
    fn zero_duration_rejected() {
        let (_tmp, ctx) = context();
        let result = run(
            &ctx,
            TemplateAction::Save {
                name: "x".into(),
                title: None,
                description: None,
                location: None,
                duration: 0,
                attendees: vec![],
            },
        );
        assert!(matches!(result, Err(ClientError::Validation(_))));
    }

    #[test]
    fn render_lists_variables() {
        let template = EventTemplate {
            title: "1:1 with {{name}}".into(),
            ..Default::default()
        };
        let text = render("one-on-one", &template);
        assert!(text.contains("Duration:  60 min"));
        assert!(text.contains("Variables: name"));
        assert!(!text.contains("Location"));
    }
}
