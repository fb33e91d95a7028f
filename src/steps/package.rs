//! `INSTALL`: package installation through apt, cargo or pip.

use crate::core::types::PackageProvider;
use shell_words::quote;

/// Generate shell to install `packages` with `provider`.
pub fn install_script(provider: PackageProvider, packages: &[String]) -> String {
    let quoted: Vec<String> = packages.iter().map(|p| quote(p).into_owned()).collect();
    let joined = quoted.join(" ");

    match provider {
        PackageProvider::Apt => format!(
            "set -eu\n\
             NEED_INSTALL=0\n\
             for pkg in {joined}; do\n\
               dpkg -s \"$pkg\" >/dev/null 2>&1 || NEED_INSTALL=1\n\
             done\n\
             if [ \"$NEED_INSTALL\" = \"1\" ]; then\n\
               apt-get update -qq\n\
               DEBIAN_FRONTEND=noninteractive apt-get install -y -qq --no-install-recommends {joined}\n\
             fi"
        ),
        PackageProvider::Cargo => {
            let installs: Vec<String> = quoted
                .iter()
                .map(|p| {
                    format!(
                        "if ! command -v {p} >/dev/null 2>&1; then\n  cargo install {p}\nfi"
                    )
                })
                .collect();
            format!("set -eu\n{}", installs.join("\n"))
        }
        PackageProvider::Pip => format!("set -eu\npip install --no-input {joined}"),
    }
}
