//! Configuration access port trait.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Every key of a section with its raw value, empty if the section is absent.
    fn section_entries(&self, section: &str) -> Vec<(String, String)>;

    /// File value first, then the process environment.
    fn get_string_or_env(&self, section: &str, key: &str, env_var: &str) -> Option<String> {
        self.get_string(section, key)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| std::env::var(env_var).ok().filter(|v| !v.trim().is_empty()))
    }
}
