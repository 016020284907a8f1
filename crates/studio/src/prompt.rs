/// Corrective request sent after an AI-generated shader fails to compile.
pub fn fix_prompt(fragment: &str, error: &str) -> String {
    format!(
        "The WGSL shader you generated has a compilation error. Please fix it.\n\n\
         Error: {error}\n\n\
         Broken shader:\n{fragment}\n\n\
         Remember: in WGSL, `let` is immutable; use `var` for variables you write to after declaration."
    )
}
