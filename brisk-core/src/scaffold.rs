//! Starter project written by `brisk init`.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScaffoldReport {
    pub created: Vec<PathBuf>,
    /// Files that already existed and were left alone.
    pub skipped: Vec<PathBuf>,
}

const FILES: &[(&str, &str)] = &[
    ("brisk.toml", BRISK_TOML),
    (".gitignore", "build/\nnode_modules/\n"),
    ("styles/main.css", "@import \"tailwindcss\";\n"),
    ("templates/default.hbs", DEFAULT_TEMPLATE),
    ("templates/blog.hbs", BLOG_TEMPLATE),
    ("templates/partials/header.hbs", HEADER_PARTIAL),
    ("templates/partials/footer.hbs", FOOTER_PARTIAL),
    ("content/index.md", INDEX_PAGE),
    ("content/about.md", ABOUT_PAGE),
    ("content/blog/hello-brisk.md", BLOG_POST),
    ("static/script.js", SCRIPT),
];

const BRISK_TOML: &str = r#"base_url = "https://example.com"

[tailwind]
command = ["npx", "@tailwindcss/cli"]
"#;

const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{{title}}</title>
  <link rel="stylesheet" href="/styles.css">
  <script defer src="/script.js"></script>
</head>
<body class="bg-white text-slate-900">
  {{> header}}
  <main class="mx-auto max-w-3xl px-4 py-10">
    <article class="prose">
      {{{content}}}
    </article>
  </main>
  {{> footer}}
</body>
</html>
"#;

const BLOG_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{{title}}</title>
  <meta name="description" content="{{description}}">
  <link rel="stylesheet" href="/styles.css">
  <script defer src="/script.js"></script>
</head>
<body class="bg-white text-slate-900">
  {{> header}}
  <main class="mx-auto max-w-3xl px-4 py-10">
    <header class="mb-8">
      <h1 class="text-4xl font-bold">{{title}}</h1>
      <p class="text-sm text-slate-500">
        <time datetime="{{date}}">{{date}}</time>
        {{#if author}}by {{author}}{{/if}}
      </p>
    </header>
    <article class="prose">
      {{{content}}}
    </article>
  </main>
  {{> footer}}
</body>
</html>
"#;

const HEADER_PARTIAL: &str = r#"<header class="border-b border-slate-200">
  <nav class="mx-auto flex max-w-3xl items-center justify-between px-4 py-4">
    <a href="/" class="text-xl font-bold">brisk</a>
    <ul class="flex gap-6">
      <li><a href="/">Home</a></li>
      <li><a href="/about.html">About</a></li>
      <li><a href="/blog/hello-brisk.html">Blog</a></li>
    </ul>
  </nav>
</header>
"#;

const FOOTER_PARTIAL: &str = r#"<footer class="mt-16 border-t border-slate-200">
  <p class="mx-auto max-w-3xl px-4 py-6 text-sm text-slate-500">Built with brisk.</p>
</footer>
"#;

const INDEX_PAGE: &str = r#"---
title: Welcome
---

# Welcome

This site was generated by **brisk**. Edit `content/index.md` and run
`brisk dev` to see your changes live.

<div class="rounded-lg bg-sky-50 p-6">Tailwind classes in Markdown work too.</div>
"#;

const ABOUT_PAGE: &str = r#"---
title: About
---

# About

| directory    | holds                                   |
|--------------|-----------------------------------------|
| `content/`   | Markdown and HTML pages                 |
| `templates/` | page templates, `partials/` for pieces  |
| `styles/`    | the Tailwind entry point                |
| `static/`    | files copied to the output as they are  |
"#;

const BLOG_POST: &str = r#"---
title: Hello, brisk
date: 2024-01-15
author: The brisk authors
template: blog
description: A first post rendered with the blog template.
---

Frontmatter fields such as `author` and `date` are available to the
template. The `template` field picks `templates/blog.hbs`.

```rust
fn main() {
    println!("hello from a highlighted code block");
}
```
"#;

const SCRIPT: &str = "document.documentElement.classList.add('js');\n";

/// Write the starter project into `root`, creating it if needed.
///
/// Existing files are never overwritten.
pub fn scaffold(root: &Path) -> Result<ScaffoldReport, ScaffoldError> {
    let mut report = ScaffoldReport::default();

    for &(relative, contents) in FILES {
        let path = root.join(relative);
        if path.exists() {
            debug!(file = %relative, "exists, skipping");
            report.skipped.push(PathBuf::from(relative));
            continue;
        }

        let io_err = |source| ScaffoldError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&path, contents).map_err(io_err)?;

        info!(file = %relative, "created");
        report.created.push(PathBuf::from(relative));
    }

    Ok(report)
}
