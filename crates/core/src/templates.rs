//! Fixed archive boilerplate.

/// Media type of the archive, also the content of its `mimetype` entry.
pub const CONTENT_TYPE: &str = "application/epub+zip";

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

/// Directory holding every publication resource.
pub const CONTENT_DIR: &str = "EPUB";

pub const PACKAGE_PATH: &str = "EPUB/package.opf";
pub const NAV_FILENAME: &str = "nav.xhtml";
pub const STYLESHEET_FILENAME: &str = "style.css";
pub const CONTENT_FILENAME: &str = "content.xhtml";

pub const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";
pub const CSS_MEDIA_TYPE: &str = "text/css";

pub const CONTAINER: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<container xmlns="urn:oasis:names:tc:opendocument:xmlns:container" version="1.0">
  <rootfiles>
    <rootfile full-path="EPUB/package.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

pub const NAV: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="fr" xml:lang="fr">
  <head>
    <meta charset="utf-8" />
    <title>LinuxFr.org</title>
  </head>
  <body>
    <nav epub:type="toc" id="toc">
      <h1>Sommaire</h1>
      <ol>
        <li><a href="content.xhtml">Aller au contenu</a></li>
      </ol>
    </nav>
  </body>
</html>
"#;

pub const STYLESHEET: &str = r#"body { font-family: sans-serif; line-height: 1.4; }
img { display: block; max-width: 100%; margin: 0.5em auto; border: 0; }
pre, code { font-family: monospace; white-space: pre-wrap; }
code { padding: 0 0.2em; border: 1px solid #ddd; border-radius: 3px; }
pre code { display: block; padding-left: 0.6em; border-width: 0 0 0 3px; border-color: #556; }
blockquote { margin: 0.8em 0 0.8em 0.8em; padding-left: 0.5em; border-left: 3px solid #556; }

article, ul.threads > li.comment {
  display: block;
  padding: 0.6em;
  border: 1px solid #988;
  border-radius: 5px;
  text-align: justify;
}
article h1 { margin: 0.4em 0; padding-left: 0.6em; border-left: 6px solid #556; font-size: 1.5em; }
article h1 a, li.comment > h2 a { color: inherit; text-decoration: none; }
header .topic::after { content: " :"; }

.meta { color: #887; }
.meta a { color: inherit; font-weight: bold; text-decoration: none; }
.tags ul { display: inline; padding: 0; }
.tags ul li { display: inline; list-style: none; }
.tags ul li + li::before { content: ", "; }

ul.poll .result { font-size: x-small; background: #f3b5c9; border-top: 1px solid #556; border-bottom: 1px solid #556; }

ul.threads, ul.threads ul { padding-left: 1em; }
ul.threads li { list-style: none; }
li.comment > h2 { font-size: 1.1em; background: #eee; clear: right; }
li.comment .avatar { float: right; margin: 0 0.3em 0.3em 0.6em; }
li.comment .content { padding-left: 0.4em; border-left: 1px solid #988; }
.deleted { font-style: italic; border-left: 3px solid #c00; }
.signature { color: #999; font-size: small; }
.signature::before { content: "-- "; }
"#;

/// Opening boilerplate of every content document, up to `<body>`.
pub const HEADER: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" lang="fr" xml:lang="fr">
  <head>
    <meta charset="utf-8" />
    <title>LinuxFr.org</title>
    <link rel="stylesheet" type="text/css" href="style.css" />
  </head>
  <body>
"#;

pub const FOOTER: &str = "\n  </body>\n</html>\n";

/// Wraps sanitized article markup into a complete content document.
pub fn content_document(body: &str) -> String {
    [HEADER, body, FOOTER].concat()
}

/// Wraps one sanitized comment thread into a complete content document.
pub fn thread_document(thread: &str) -> String {
    [HEADER, r#"<ul class="threads">"#, thread, "</ul>", FOOTER].concat()
}
