use serde::Serialize;
use tera::{Context, Error as TeraError, Tera};

/// Template used for every session's system message
pub const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn render_system(context: Value) -> String {
        load_prompt(SYSTEM_TEMPLATE, &context)
            .unwrap()
            .trim()
            .to_string()
    }

    fn context(tools: Value, markdown: bool, datetime: Option<&str>) -> Value {
        json!({
            "description": "You plan trips.",
            "instructions": ["Ask for dates", "Suggest destinations"],
            "tools": tools,
            "markdown": markdown,
            "datetime": datetime,
        })
    }

    #[test]
    fn test_system_without_tools_or_flags() {
        let rendered = render_system(context(json!([]), false, None));
        assert_eq!(
            rendered,
            "You plan trips.\n\n## Instructions\n\n1. Ask for dates\n2. Suggest destinations"
        );
    }

    #[test]
    fn test_system_tools_block() {
        let tools = json!([
            {"name": "web_search", "signature": "query: string", "description": "Search the web"},
            {"name": "read_article", "signature": "url: string", "description": "Read a page"},
        ]);
        let rendered = render_system(context(tools, false, None));
        assert_eq!(
            rendered,
            "You plan trips.\n\n## Instructions\n\n1. Ask for dates\n2. Suggest destinations\n\n\
             ## Tools\n\
             You can call the following tools. Call a tool only when it helps answer the request.\n\n\
             - web_search(query: string): Search the web\n\
             - read_article(url: string): Read a page"
        );
    }

    #[test]
    fn test_system_markdown_and_datetime_lines() {
        let rendered = render_system(context(json!([]), true, Some("2024-05-01 09:30:00 UTC")));
        assert!(rendered.ends_with(
            "2. Suggest destinations\n\n\
             Use markdown to format your answers.\n\
             The current time is 2024-05-01 09:30:00 UTC."
        ));

        let rendered = render_system(context(json!([]), false, Some("2024-05-01 09:30:00 UTC")));
        assert!(!rendered.contains("markdown"));
        assert!(rendered.ends_with(
            "2. Suggest destinations\n\nThe current time is 2024-05-01 09:30:00 UTC."
        ));
    }

    #[test]
    fn test_system_requires_description() {
        let mut context = context(json!([]), false, None);
        context.as_object_mut().unwrap().remove("description");
        assert!(load_prompt(SYSTEM_TEMPLATE, &context).is_err());
    }

    #[test]
    fn test_load_prompt_does_not_escape() {
        let context = json!({"rule": "Use <b>bold</b> & \"quotes\""});
        let result = load_prompt("{{ rule }}", &context).unwrap();
        assert_eq!(result, "Use <b>bold</b> & \"quotes\"");
    }
}
