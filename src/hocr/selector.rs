use crate::error::{Error, QueryError, Result};
use crate::hocr::document::{Document, NodeId};
use crate::hocr::query::Query;
use lazy_static::lazy_static;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::io::BufRead;

/// Query used when `extract_bboxes` is given no queries.
pub const ALL_TITLED_QUERY: &str = "//*[@title]";

/// Word elements whose only child elements are alternatives containers.
pub const WORDS_QUERY: &str = "//*[@class='ocr_word' and not(*[not(@class='alternatives')])] \
     | //*[@class='ocrx_word' and not(*[not(@class='alternatives')])]";

/// Word elements holding a direct text node and no child elements at all.
pub const UNCHECKED_WORDS_QUERY: &str = "//*[@class='ocr_word' and text() and not(*)] \
     | //*[@class='ocrx_word' and text() and not(*)]";

lazy_static! {
    static ref BBOX: Regex = Regex::new(r"bbox\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+)").unwrap();
    static ref WORDS: Query = Query::parse(WORDS_QUERY).unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BoundingBox {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl BoundingBox {
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// First `bbox a b c d` found anywhere in `title`. Coordinates are not validated.
    pub fn from_title(title: &str) -> Option<Self> {
        let caps = BBOX.captures(title)?;
        let coord = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();
        Some(Self::new(coord(1)?, coord(2)?, coord(3)?, coord(4)?))
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bbox {} {} {} {}", self.x0, self.y0, self.x1, self.y1)
    }
}

/// Boxes for one query of a grouped extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryBoxes {
    pub query: String,
    pub boxes: std::result::Result<Vec<BoundingBox>, QueryError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BboxResult {
    /// Every titled element of the document, no queries given.
    Ungrouped(Vec<BoundingBox>),
    /// One entry per query, in the order the queries were given.
    Grouped(Vec<QueryBoxes>),
}

impl BboxResult {
    pub fn get(&self, query: &str) -> Option<&std::result::Result<Vec<BoundingBox>, QueryError>> {
        match self {
            BboxResult::Ungrouped(_) => None,
            BboxResult::Grouped(groups) => groups.iter().find(|g| g.query == query).map(|g| &g.boxes),
        }
    }
}

/// Extract bounding boxes, either ungrouped (no queries) or per query.
///
/// Each query is evaluated on its own: an element matched by two queries
/// shows up under both, and an invalid query does not affect the others.
pub fn extract_bboxes(doc: &Document, queries: &[&str]) -> BboxResult {
    if queries.is_empty() {
        let boxes = doc
            .select(ALL_TITLED_QUERY)
            .map(|nodes| boxes_of(doc, &nodes))
            .unwrap_or_default();
        return BboxResult::Ungrouped(boxes);
    }

    let groups = queries
        .iter()
        .map(|query| QueryBoxes {
            query: query.to_string(),
            boxes: doc.select(query).map(|nodes| boxes_of(doc, &nodes)),
        })
        .collect();
    BboxResult::Grouped(groups)
}

fn boxes_of(doc: &Document, nodes: &[NodeId]) -> Vec<BoundingBox> {
    nodes
        .iter()
        .filter_map(|id| doc.attribute(*id, "title"))
        .filter_map(BoundingBox::from_title)
        .collect()
}

/// The two recognized word markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordClass {
    /// `ocr_word`
    Plain,
    /// `ocrx_word`
    Extended,
}

impl WordClass {
    pub fn class_name(self) -> &'static str {
        match self {
            WordClass::Plain => "ocr_word",
            WordClass::Extended => "ocrx_word",
        }
    }

    /// Unchecked words of this class only.
    pub fn unchecked_query(self) -> &'static str {
        match self {
            WordClass::Plain => "//*[@class='ocr_word' and text() and not(*)]",
            WordClass::Extended => "//*[@class='ocrx_word' and text() and not(*)]",
        }
    }
}

/// A word element selected from a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordElement {
    /// Direct text of the element, trimmed.
    pub text: String,
    pub node: NodeId,
}

impl WordElement {
    pub fn path(&self, doc: &Document) -> String {
        doc.path_of(self.node)
    }
}

/// Word elements selected by `query`, in document order.
pub fn select_words(doc: &Document, query: &str) -> Result<Vec<WordElement>> {
    let query = Query::parse(query).map_err(Error::Query)?;
    Ok(words_of(doc, query.select(doc)))
}

/// Every word element of either class, including words that already carry
/// an alternatives container.
pub fn extract_words(doc: &Document) -> Vec<WordElement> {
    words_of(doc, WORDS.select(doc))
}

fn words_of(doc: &Document, nodes: Vec<NodeId>) -> Vec<WordElement> {
    nodes
        .into_iter()
        .filter(|id| doc.element(*id).is_some())
        .map(|node| WordElement {
            text: doc.direct_text(node).trim().to_string(),
            node,
        })
        .collect()
}

/// Lazily stream the text of every `ocrx_word` element from `source`.
///
/// The source is read once; mismatched closing tags are tolerated.
pub fn extract_word_tokens<R: BufRead>(source: R) -> WordTokens<R> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().check_end_names = false;
    WordTokens {
        reader,
        buf: Vec::new(),
        depth: 0,
        current: String::new(),
        done: false,
    }
}

pub struct WordTokens<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    // nesting depth inside the current word element, 0 when outside
    depth: usize,
    current: String,
    done: bool,
}

fn has_class(start: &BytesStart<'_>, class: &str) -> bool {
    start
        .attributes()
        .flatten()
        .filter(|a| a.key.as_ref() == b"class")
        .any(|a| {
            String::from_utf8_lossy(&a.value)
                .split_whitespace()
                .any(|c| c == class)
        })
}

impl<R: BufRead> Iterator for WordTokens<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            };

            match event {
                Event::Start(e) => {
                    if self.depth > 0 {
                        self.depth += 1;
                    } else if has_class(&e, WordClass::Extended.class_name()) {
                        self.depth = 1;
                        self.current.clear();
                    }
                }
                Event::End(_) if self.depth > 0 => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        let word = self.current.trim();
                        if !word.is_empty() {
                            return Some(Ok(word.to_string()));
                        }
                    }
                }
                Event::Text(e) if self.depth > 0 => match e.unescape() {
                    Ok(text) => self.current.push_str(&text),
                    Err(err) => {
                        self.done = true;
                        return Some(Err(err.into()));
                    }
                },
                Event::CData(e) if self.depth > 0 => {
                    self.current.push_str(&String::from_utf8_lossy(&e));
                }
                Event::Eof => self.done = true,
                _ => {}
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_simple_word_extract() {
        let html = r#"<html><body><span class='ocrx_word' id='word_10' title="bbox 260 196 305 232">εἰς</span></body><html>"#;
        let tokens: Vec<String> = extract_word_tokens(Cursor::new(html))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(tokens, vec!["εἰς"]);
    }

    #[test]
    fn test_word_tokens_are_lazy_and_ordered() {
        let html = r#"<body>
            <span class="ocr_line"><span class="ocrx_word">first</span> <span class="ocrx_word"><em>sec</em>ond</span></span>
            <span class="ocr_word">plain</span>
        </body>"#;
        let mut tokens = extract_word_tokens(Cursor::new(html));
        assert_eq!(tokens.next().unwrap().unwrap(), "first");
        assert_eq!(tokens.next().unwrap().unwrap(), "second");
        assert!(tokens.next().is_none());
        assert!(tokens.next().is_none());
    }

    #[test]
    fn test_bbox_extract_simple() {
        let doc = Document::parse(r#"<root title="bbox 1 2 3 4"></root>"#).unwrap();
        assert_eq!(
            extract_bboxes(&doc, &[]),
            BboxResult::Ungrouped(vec![BoundingBox::new(1, 2, 3, 4)])
        );
    }

    #[test]
    fn test_bbox_extract_complex() {
        let doc = Document::parse(
            r#"<root>
                 <p title="text before bbox 1 2 3 4"></p>
                 <p title="bbox 5 6 7 8textafter"></p>
                 <p title="textbeforebbox 9 10 11 12textafter"></p>
                 <p title="no box here"></p>
               </root>"#,
        )
        .unwrap();
        assert_eq!(
            extract_bboxes(&doc, &[]),
            BboxResult::Ungrouped(vec![
                BoundingBox::new(1, 2, 3, 4),
                BoundingBox::new(5, 6, 7, 8),
                BoundingBox::new(9, 10, 11, 12),
            ])
        );
    }

    #[test]
    fn test_bbox_extract_by_name_multi() {
        let doc = Document::parse(
            r#"<root>
                <p class="c1" title="text before bbox 1 2 3 4"></p>
                <p class="c2" title="bbox 5 6 7 8textafter"></p>
                <p class="c3" title="textbeforebbox 9 10 11 12textafter"></p>
                <p class="whatever" title="13 14 15 16"></p>
                <p class="more whatever" title="bbox 17 18 19 20"></p>
            </root>"#,
        )
        .unwrap();
        let queries = [
            "//*[@class='c1' and @title]",
            "//*[@class='c2' and @title]",
            "//*[@class='c3' and @title]",
        ];
        let result = extract_bboxes(&doc, &queries);

        assert_eq!(result.get(queries[0]), Some(&Ok(vec![BoundingBox::new(1, 2, 3, 4)])));
        assert_eq!(result.get(queries[1]), Some(&Ok(vec![BoundingBox::new(5, 6, 7, 8)])));
        assert_eq!(result.get(queries[2]), Some(&Ok(vec![BoundingBox::new(9, 10, 11, 12)])));
        match result {
            BboxResult::Grouped(groups) => assert_eq!(groups.len(), 3),
            BboxResult::Ungrouped(_) => panic!("expected grouped result"),
        }
    }

    #[test]
    fn test_bbox_overlapping_and_invalid_queries() {
        let doc = Document::parse(r#"<root><p class="c1" title="bbox 1 2 3 4"/></root>"#).unwrap();
        let result = extract_bboxes(&doc, &["//p", "//*[@class='c1']", "//p[", "//table"]);

        assert_eq!(result.get("//p"), Some(&Ok(vec![BoundingBox::new(1, 2, 3, 4)])));
        assert_eq!(result.get("//*[@class='c1']"), Some(&Ok(vec![BoundingBox::new(1, 2, 3, 4)])));
        assert!(matches!(result.get("//p["), Some(Err(_))));
        assert_eq!(result.get("//table"), Some(&Ok(vec![])));
    }

    #[test]
    fn test_malformed_boxes_pass_through() {
        assert_eq!(
            BoundingBox::from_title("bbox 30 40 10 20; x_wconf 93"),
            Some(BoundingBox::new(30, 40, 10, 20))
        );
        assert_eq!(BoundingBox::from_title("bbox 1 2 3"), None);
    }

    #[test]
    fn test_extract_words() {
        let doc = Document::parse(
            r#"<root>
                <span class='ocr_word' title='bbox 1 2 3 4'>plain</span>
                <span class='ocrx_word' title='bbox 1 2 3 4'>extended</span>
                <span class='ocrx_word'><span class='ocr_cinfo'>nested</span></span>
                <span class='ocr_word'>
                  annotated
                  <span class="alternatives"><ins class="alt" title="nlp 0.9">x</ins></span>
                </span>
                <span class='ocr_line'>line</span>
            </root>"#,
        )
        .unwrap();
        let words: Vec<String> = extract_words(&doc).into_iter().map(|w| w.text).collect();
        assert_eq!(words, vec!["plain", "extended", "annotated"]);
    }

    #[test]
    fn test_unchecked_selection_excludes_nested_and_annotated() {
        let doc = Document::parse(
            r#"<root>
                <span class='ocrx_word'>aaa</span>
                <span class='ocrx_word'><span>nested</span></span>
                <span class='ocr_word'>bbb<span class="alternatives"/></span>
                <span class='ocr_word'>ccc</span>
            </root>"#,
        )
        .unwrap();
        let words = select_words(&doc, UNCHECKED_WORDS_QUERY).unwrap();
        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["aaa", "ccc"]);
        assert_eq!(words[0].path(&doc), "/root/span[1]");

        let plain = select_words(&doc, WordClass::Plain.unchecked_query()).unwrap();
        assert_eq!(plain.len(), 1);
        assert_eq!(plain[0].text, "ccc");
    }

    #[test]
    fn test_select_words_reports_query_errors() {
        let doc = Document::parse("<root/>").unwrap();
        assert!(matches!(select_words(&doc, "//*[@class="), Err(Error::Query(_))));
    }
}
