use tera::{Context, Tera};

use crate::error::Result;
use super::hook::{HookGroup, HookKind, HookUsage};

const SAMPLE_TEMPLATE_NAME: &str = "sample.php";

const SAMPLE_TEMPLATE: &str = "<?php
{{ command }}( {{ hook }}, '{{ callback }}', {{ priority }}, {{ num_args }} );

function {{ callback }}({{ params }}) {
\t// your code
{% if is_filter %}\treturn $something;
{% endif %}}
";

const SAMPLE_CALLBACK: &str = "my_function";
const SAMPLE_PRIORITY: u32 = 10;

/// Ready-to-paste callback snippet for one usage
#[derive(Debug, Clone, PartialEq, Eq)]
struct Sample {
    code: String,
    arg_count: usize,
}

/// Groups flat usages into per-hook entries with generated samples
pub struct HookAggregator {
    tera: Tera,
}

impl HookAggregator {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(SAMPLE_TEMPLATE_NAME, SAMPLE_TEMPLATE)?;
        Ok(Self { tera })
    }

    /// Sort usages by `(hook name, line)` and group equal names together
    pub fn reduce_and_sort(&self, usages: Vec<HookUsage>) -> Result<Vec<HookGroup>> {
        let mut sampled = usages
            .into_iter()
            .map(|usage| Ok((self.sample(&usage)?, usage)))
            .collect::<Result<Vec<_>>>()?;

        // Byte order, stable so equal keys keep scan order
        sampled.sort_by(|(_, a), (_, b)| {
            a.hook_name
                .as_bytes()
                .cmp(b.hook_name.as_bytes())
                .then(a.line_start.cmp(&b.line_start))
        });

        let mut groups: Vec<HookGroup> = Vec::new();
        for (sample, usage) in sampled {
            match groups.last_mut() {
                Some(group) if group.hook_name == usage.hook_name => {
                    if group.doc_comment.is_empty() {
                        group.doc_comment = usage.doc_comment.clone();
                    }
                    group.usages.push(usage);
                }
                _ => groups.push(HookGroup {
                    hook_name: usage.hook_name.clone(),
                    kind: usage.kind,
                    arg_count: sample.arg_count,
                    doc_comment: usage.doc_comment.clone(),
                    sample_code: sample.code,
                    usages: vec![usage],
                    visible: true,
                    expanded: false,
                }),
            }
        }

        Ok(groups)
    }

    fn sample(&self, usage: &HookUsage) -> Result<Sample> {
        if usage.kind == HookKind::Shortcode {
            return Ok(Sample {
                code: String::new(),
                arg_count: 1,
            });
        }

        let hook = usage
            .parameters
            .first()
            .cloned()
            .unwrap_or_else(|| format!("'{}'", usage.hook_name));
        let args = usage.parameters.get(1..).unwrap_or_default();
        let params = if args.is_empty() {
            String::new()
        } else {
            format!(" {} ", args.join(", "))
        };

        let mut context = Context::new();
        context.insert("command", usage.kind.registration_function());
        context.insert("hook", &hook);
        context.insert("callback", SAMPLE_CALLBACK);
        context.insert("priority", &SAMPLE_PRIORITY);
        context.insert("num_args", &args.len());
        context.insert("params", &params);
        context.insert("is_filter", &(usage.kind == HookKind::Filter));

        Ok(Sample {
            code: self.tera.render(SAMPLE_TEMPLATE_NAME, &context)?,
            arg_count: args.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use predicates::prelude::*;

    fn usage(name: &str, kind: HookKind, line: usize, params: &[&str]) -> HookUsage {
        HookUsage {
            hook_name: name.to_string(),
            kind,
            line_start: line,
            line_end: line,
            source_code: String::new(),
            doc_comment: String::new(),
            parameters: params.iter().map(|p| p.to_string()).collect(),
            file: String::new(),
        }
    }

    fn action(name: &str, line: usize) -> HookUsage {
        let quoted = format!("'{}'", name);
        usage(name, HookKind::Action, line, &[quoted.as_str(), "$arg"])
    }

    #[test]
    fn test_groups_sorted_by_name_then_line() {
        let aggregator = HookAggregator::new().unwrap();
        let input = vec![
            action("hook_5", 1),
            action("hook_5", 2),
            action("hook_1", 3),
            action("hook_3", 6),
            action("hook_3", 4),
            action("hook_3", 5),
        ];

        let groups = aggregator.reduce_and_sort(input).unwrap();

        let names: Vec<&str> = groups.iter().map(|g| g.hook_name.as_str()).collect();
        assert_eq!(names, vec!["hook_1", "hook_3", "hook_5"]);
        let lines: Vec<usize> = groups[1].usages.iter().map(|u| u.line_start).collect();
        assert_eq!(lines, vec![4, 5, 6]);
        assert!(groups.iter().all(|g| g.visible && !g.expanded));
    }

    #[test]
    fn test_grouping_keeps_every_usage() {
        let aggregator = HookAggregator::new().unwrap();
        let input: Vec<HookUsage> = (0..25)
            .map(|i| action(&format!("hook_{}", i % 7), 30 - i))
            .collect();

        let groups = aggregator.reduce_and_sort(input).unwrap();

        assert_eq!(groups.iter().map(|g| g.usages.len()).sum::<usize>(), 25);
        for pair in groups.windows(2) {
            assert!(pair[0].hook_name < pair[1].hook_name);
        }
        for group in &groups {
            assert!(group.usages.iter().all(|u| u.hook_name == group.hook_name));
            for pair in group.usages.windows(2) {
                assert!(pair[0].line_start <= pair[1].line_start);
            }
        }
    }

    #[test]
    fn test_sort_is_byte_order_and_stable() {
        let aggregator = HookAggregator::new().unwrap();
        let mut first = action("shared_hook", 4);
        first.file = "a.php".to_string();
        let mut second = action("shared_hook", 4);
        second.file = "b.php".to_string();

        let groups = aggregator
            .reduce_and_sort(vec![action("b", 1), action("B", 1), first, second])
            .unwrap();

        let names: Vec<&str> = groups.iter().map(|g| g.hook_name.as_str()).collect();
        assert_eq!(names, vec!["B", "b", "shared_hook"]);
        let files: Vec<&str> = groups[2].usages.iter().map(|u| u.file.as_str()).collect();
        assert_eq!(files, vec!["a.php", "b.php"]);
    }

    #[test]
    fn test_first_non_empty_doc_comment_wins() {
        let aggregator = HookAggregator::new().unwrap();
        let mut documented = action("init", 9);
        documented.doc_comment = "/** Fires after setup. */".to_string();
        let mut later = action("init", 20);
        later.doc_comment = "/** Other. */".to_string();

        let groups = aggregator
            .reduce_and_sort(vec![later, action("init", 1), documented])
            .unwrap();

        assert_eq!(groups[0].doc_comment, "/** Fires after setup. */");
    }

    #[test]
    fn test_action_sample() {
        let aggregator = HookAggregator::new().unwrap();
        let groups = aggregator
            .reduce_and_sort(vec![usage(
                "save",
                HookKind::Action,
                1,
                &["'save'", "$post_id", "$post"],
            )])
            .unwrap();

        let sample = &groups[0].sample_code;
        assert_eq!(groups[0].arg_count, 2);
        let registration = "<?php\nadd_action( 'save', 'my_function', 10, 2 );\n\n";
        let callback = "function my_function( $post_id, $post ) {\n\t// your code\n}";
        assert!(predicate::str::starts_with(registration).eval(sample));
        assert!(predicate::str::contains(callback).eval(sample));
        assert!(predicate::str::contains("return").not().eval(sample));
    }

    #[test]
    fn test_filter_sample_returns_value() {
        let aggregator = HookAggregator::new().unwrap();
        let groups = aggregator
            .reduce_and_sort(vec![usage(
                "the_title",
                HookKind::Filter,
                1,
                &["'the_title'", "$title"],
            )])
            .unwrap();

        let sample = &groups[0].sample_code;
        assert!(sample.contains("add_filter( 'the_title', 'my_function', 10, 1 );"));
        assert!(sample.contains("\t// your code\n\treturn $something;\n}"));
    }

    #[test]
    fn test_sample_without_arguments() {
        let aggregator = HookAggregator::new().unwrap();
        let groups = aggregator
            .reduce_and_sort(vec![usage("init", HookKind::Action, 1, &["'init'"])])
            .unwrap();

        assert_eq!(groups[0].arg_count, 0);
        assert!(groups[0].sample_code.contains("10, 0 );"));
        assert!(groups[0].sample_code.contains("function my_function() {"));
    }

    #[test]
    fn test_shortcode_has_no_sample() {
        let aggregator = HookAggregator::new().unwrap();
        let groups = aggregator
            .reduce_and_sort(vec![usage("box", HookKind::Shortcode, 2, &["width", "height"])])
            .unwrap();

        assert_eq!(groups[0].sample_code, "");
        assert_eq!(groups[0].arg_count, 1);
        assert_eq!(groups[0].kind, HookKind::Shortcode);
    }

    #[test]
    fn test_empty_input() {
        let aggregator = HookAggregator::new().unwrap();
        assert!(aggregator.reduce_and_sort(Vec::new()).unwrap().is_empty());
    }
}
