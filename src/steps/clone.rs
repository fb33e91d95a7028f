//! `CLONE`: fetch a git repository into a directory under the cwd.

use shell_words::quote;

/// Generate the `git clone` command line. The target directory is always
/// the last word so callers can recover it.
pub fn clone_script(url: &str, directory: &str, branch: Option<&str>, depth: Option<u32>) -> String {
    let mut words = vec!["git".to_string(), "clone".to_string()];
    if let Some(branch) = branch {
        words.push("--branch".to_string());
        words.push(quote(branch).into_owned());
    }
    if let Some(depth) = depth {
        words.push("--depth".to_string());
        words.push(depth.to_string());
    }
    words.push("--".to_string());
    words.push(quote(url).into_owned());
    words.push(quote(directory).into_owned());
    words.join(" ")
}
