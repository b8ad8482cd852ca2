#[derive(Default)]
pub struct OutputBuilder {
    indent: usize,
    header: Option<String>,
    properties: Vec<(String, String)>,
    children: Vec<String>,
}

impl OutputBuilder {
    pub fn new<H: ToString>(header: H) -> Self {
        Self {
            header: Some(header.to_string()),
            ..Default::default()
        }
    }

    pub fn build(self) -> String {
        let OutputBuilder {
            indent,
            header,
            properties,
            children,
        } = self;

        let mut output = String::new();
        let width = properties.iter().map(|(k, _)| k.len()).max().unwrap_or(0);

        if let Some(header) = header {
            output.push_str(&format!("{:indent$}● {header}\n", ""));
        }

        for (key, value) in &properties {
            output.push_str(&format!(
                "{:indent$}{key:>width$}: {value}\n",
                "",
                indent = indent + 4
            ));
        }

        for child in children {
            output.push_str(&child);
        }

        output
    }

    pub fn property<K: ToString, V: ToString>(&mut self, key: K, value: V) {
        self.properties.push((key.to_string(), value.to_string()));
    }

    pub fn indent(&mut self, width: usize) {
        self.indent += width;
    }

    pub fn section<H: Into<String>>(
        &mut self,
        header: H,
        builder: impl FnOnce(&mut OutputBuilder),
    ) {
        let mut section_builder = OutputBuilder {
            indent: self.indent,
            header: Some(header.into()),
            properties: vec![],
            children: vec![],
        };

        (builder)(&mut section_builder);

        self.children.push(section_builder.build());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_render_in_insertion_order() {
        let mut output = OutputBuilder::new("Header");
        output.property("first", 1);
        output.property("second property", 2);

        let rendered = output.build();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], "● Header");
        assert!(lines[1].ends_with("first: 1"));
        assert!(lines[2].ends_with("second property: 2"));
    }

    #[test]
    fn sections_nest_under_their_parent() {
        let mut output = OutputBuilder::new("Parent");
        output.indent(2);
        output.section("Child", |builder| {
            builder.property("key", "value");
        });

        let rendered = output.build();

        assert!(rendered.contains("  ● Child\n"));
        assert!(rendered.contains("key: value"));
    }
}
