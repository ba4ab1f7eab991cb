//! System prompts for the two pipeline stages. The wording is the
//! Chinese the pipeline was tuned with, matching the requests it
//! expects.

use std::fmt;

use handlebars::Handlebars;

#[derive(Debug)]
pub enum Prompt {
    Extraction,
    Generation,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

const EXTRACTION_PROMPT: &str = r"
你需要将用户输入的界面需求做一下提取, 如一个报名表界面, 至少应该包含一个表格, 一个图片, 一个按钮, 以及一个信息填写表单
最终输出成这样的格式: '生成一个xx界面, 包含一个xx, 一个xx, 一个xx, 以及一个xx'
";

const GENERATION_PROMPT: &str = r"
你需要将用户输入的自然语言转化成相应的UIDL格式代码;
这是我提供给你的UIDL协议规范 (版本 {{version}}), 给你作为参考:
'''
{{grammar}}
'''
最终输出为一个json格式的代码块
";

pub fn templates<'a>() -> Handlebars<'a> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    // The grammar is embedded byte for byte, not as HTML
    registry.register_escape_fn(handlebars::no_escape);
    registry
        .register_template_string(&Prompt::Extraction.to_string(), EXTRACTION_PROMPT)
        .expect("Failed to register template");
    registry
        .register_template_string(&Prompt::Generation.to_string(), GENERATION_PROMPT)
        .expect("Failed to register template");
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn it_renders_the_extraction_prompt() {
        let out = templates()
            .render(&Prompt::Extraction.to_string(), &json!({}))
            .unwrap();
        assert!(out.contains("生成一个xx界面, 包含一个xx"));
    }

    #[test]
    fn it_embeds_the_grammar_verbatim() {
        let grammar = "nodes:\n  a: { type: \"element\", x: '<b>&' }";
        let out = templates()
            .render(
                &Prompt::Generation.to_string(),
                &json!({"grammar": grammar, "version": "1.0.0"}),
            )
            .unwrap();
        assert!(out.contains(grammar));
        assert!(out.contains("版本 1.0.0"));
        assert!(out.contains("json格式的代码块"));
    }

    #[test]
    fn it_requires_the_grammar() {
        let result = templates().render(&Prompt::Generation.to_string(), &json!({"version": "1"}));
        assert!(result.is_err());
    }
}
