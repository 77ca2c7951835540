use crate::core::config::data::{Config, CONFIG_KEYS};

impl Config {
    pub fn render_all(&self) -> Vec<String> {
        let mut lines = vec!["Current configuration:".to_string()];
        for key in CONFIG_KEYS {
            let value = self
                .get_value(key)
                .unwrap_or_else(|err| format!("<{err}>"));
            lines.push(format!("  {key}: {value}"));
        }
        lines
    }

    pub fn print_all(&self) {
        for line in self.render_all() {
            println!("{line}");
        }
    }
}
