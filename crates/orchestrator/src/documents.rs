//! Fixed file set published alongside the artifact.

use chrono::NaiveDate;
use pagesmith_core::Round;

pub const ARTIFACT_PATH: &str = "index.html";
pub const LICENSE_PATH: &str = "LICENSE";
pub const README_PATH: &str = "README.md";

pub fn readme_content(task: &str, brief: &str, round: Round, date: NaiveDate) -> String {
    format!(
        r#"# {task}

## Summary
This web application was generated to fulfill the following requirement:

{brief}

## Setup
This is a static web application that requires no installation. Simply open `index.html` in a web browser.

## Usage
1. Clone this repository
2. Open `index.html` in your web browser
3. The application is ready to use

## Code Explanation
This application is built as a single-file HTML application containing:
- **HTML Structure**: The core markup and content
- **CSS Styling**: Embedded styles for visual presentation
- **JavaScript Logic**: Client-side functionality and interactivity

All components are contained within the `index.html` file for easy deployment and portability.

## Deployment
This application is deployed via GitHub Pages and is accessible at the Pages URL provided in the repository settings.

## License
This project is licensed under the MIT License - see the LICENSE file for details.

---
*Generated on {date} - Round {round}*
"#,
        date = date.format("%Y-%m-%d"),
        round = round.number(),
    )
}

pub fn mit_license(holder: &str, year: i32) -> String {
    format!(
        r#"MIT License

Copyright (c) {year} {holder}

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
"#
    )
}

/// First `max` characters of `text`, with an ellipsis when cut.
pub fn excerpt(text: &str, max: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readme_footer() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let readme = readme_content("demo-app", "a todo list", Round::Revision, date);

        assert!(readme.starts_with("# demo-app\n"));
        assert!(readme.contains("a todo list"));
        assert!(readme.trim_end().ends_with("*Generated on 2026-03-09 - Round 2*"));
    }

    #[test]
    fn test_license_header() {
        let license = mit_license("octo", 2026);
        assert!(license.starts_with("MIT License\n\nCopyright (c) 2026 octo\n"));
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("abcdefgh", 3), "abc...");
        assert_eq!(excerpt("héllo wörld", 4), "héll...");
    }
}
