//! XML documents shared by the integration tests. Kept free of
//! insignificant whitespace so positions count only the nodes shown.

pub const PRICES: &str =
    r#"<root><item price="10"/><item price="20"/><item price="30"/></root>"#;

pub const LIBRARY: &str = concat!(
    "<library>",
    "<book><title>Dune</title><author>Herbert</author></book>",
    "<book><title>Emma</title><author>Austen</author></book>",
    "<shelf><book><title>Ubik</title><author>Dick</author></book></shelf>",
    "</library>"
);

pub const FAMILY: &str = concat!(
    r#"<doc>"#,
    r#"<a id="a1"><b id="b1"><c id="c1"/><c id="c2"/></b><b id="b2"><c id="c3"/></b></a>"#,
    r#"<d id="d1" xml:lang="en-GB"><!--note--><e id="e1">text</e><?tool run?></d>"#,
    r#"</doc>"#
);

pub const CATALOG: &str = concat!(
    r#"<catalog xmlns="urn:books" xmlns:p="urn:people">"#,
    r#"<book year="1965"><title>Dune</title><p:author>Herbert</p:author></book>"#,
    r#"<book year="1815"><title>Emma</title><p:author>Austen</p:author></book>"#,
    r#"</catalog>"#
);
