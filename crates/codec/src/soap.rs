//! SOAP 1.1 request envelopes and response unwrapping for the email-marketing
//! API.
//!
//! Requests put the action element, carrying the service namespace, directly in
//! `soap:Body`, with the API key first and the encoded parameters after it.
//! Responses are decoded from `soap:Body` down and unwrapped to the
//! `{action}Result` element.

use std::io::Read;

use quick_xml::escape::escape;
use tracing::debug;

use crate::error::{CodecError, Result};
use crate::tree::Tree;
use crate::xml::{
    DecodeOptions, EncodeOptions, RootScope, decode_reader, encode_with, is_valid_element_name,
};

/// Root scope of a SOAP response payload.
pub const SOAP_BODY_SCOPE: &str = "/soap:Envelope/soap:Body";

/// Service namespace of the hosted API.
pub const DEFAULT_NAMESPACE: &str = "http://api.createsend.com/api/";

const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
const SOAP_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Indent of the parameters inside the action element.
const PARAM_INDENT: &str = "\t\t";

/// One API call, ready to be rendered as a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapRequest {
    /// Dotted action name, e.g. `Subscriber.Add`.
    pub action: String,
    /// Service namespace; also the SOAPAction prefix.
    pub namespace: String,
    pub api_key: String,
    /// Parameter mapping encoded after the API key.
    pub params: Tree,
}

impl SoapRequest {
    /// Creates a request against [`DEFAULT_NAMESPACE`] with no parameters.
    pub fn new(action: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            api_key: api_key.into(),
            params: Tree::mapping(),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn params(mut self, params: Tree) -> Self {
        self.params = params;
        self
    }

    /// Value of the `SOAPAction` HTTP header, quotes included.
    pub fn soap_action(&self) -> String {
        format!("\"{}{}\"", self.namespace, self.action)
    }

    /// Renders the full request body.
    ///
    /// ```
    /// use cmkit_codec::{Tree, soap::SoapRequest};
    ///
    /// let body = SoapRequest::new("Subscriber.Add", "key")
    ///     .params(Tree::from([("ListID", Tree::from("42"))]))
    ///     .envelope()?;
    /// assert!(body.contains("\t\t<ListID>42</ListID>\n"));
    /// # Ok::<(), cmkit_codec::CodecError>(())
    /// ```
    pub fn envelope(&self) -> Result<String> {
        if !is_valid_element_name(&self.action) {
            return Err(CodecError::invalid_shape(
                "/",
                format!("{:?} is not a valid action name", self.action),
            ));
        }
        let params = encode_with(&self.params, &EncodeOptions::default().indent(PARAM_INDENT))?;

        let mut body = String::with_capacity(512 + params.len());
        body.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        body.push_str(&format!(
            "<soap:Envelope xmlns:xsi=\"{}\" xmlns:xsd=\"{}\" xmlns:soap=\"{}\">\n",
            XSI_NS, XSD_NS, SOAP_NS
        ));
        body.push_str("<soap:Body>\n");
        body.push_str(&format!(
            "\t<{} xmlns=\"{}\">\n",
            self.action,
            escape(self.namespace.as_str())
        ));
        body.push_str(&format!("\t\t<ApiKey>{}</ApiKey>\n", escape(self.api_key.as_str())));
        body.push_str(&params);
        body.push_str(&format!("\t</{}>\n", self.action));
        body.push_str("</soap:Body>\n");
        body.push_str("</soap:Envelope>");

        debug!(action = %self.action, bytes = body.len(), "Built SOAP envelope");
        Ok(body)
    }
}

/// Decodes a SOAP response and returns the `{action}Result` payload.
///
/// Returns `Ok(None)` when the body has no result for `action`, e.g. for a
/// SOAP fault.
pub fn decode_soap_response(xml: &str, action: &str) -> Result<Option<Tree>> {
    decode_soap_reader(xml.as_bytes(), action, &DecodeOptions::default())
}

/// Streaming form of [`decode_soap_response`].
///
/// The window size and charset of `options` are honoured; its scope is
/// replaced by [`SOAP_BODY_SCOPE`].
pub fn decode_soap_reader<R: Read>(
    source: R,
    action: &str,
    options: &DecodeOptions,
) -> Result<Option<Tree>> {
    let options = DecodeOptions {
        scope: RootScope::parse(SOAP_BODY_SCOPE)?,
        ..options.clone()
    };
    let mut body = decode_reader(source, &options)?;

    let result = body
        .take(&format!("{}Response", action))
        .and_then(|mut response| response.take(&format!("{}Result", action)));
    if result.is_none() {
        debug!(action, "SOAP response carries no result");
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_layout() {
        let request = SoapRequest::new("Subscriber.Add", "secret").params(Tree::from([
            ("ListID", Tree::from("42")),
            ("Email", Tree::from("a@example.com")),
        ]));

        let expected = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
<soap:Envelope xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\" \
xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\">\n\
<soap:Body>\n\
\t<Subscriber.Add xmlns=\"http://api.createsend.com/api/\">\n\
\t\t<ApiKey>secret</ApiKey>\n\
\t\t<ListID>42</ListID>\n\
\t\t<Email>a@example.com</Email>\n\
\t</Subscriber.Add>\n\
</soap:Body>\n\
</soap:Envelope>";
        assert_eq!(request.envelope().unwrap(), expected);
    }

    #[test]
    fn test_soap_action_header() {
        let request = SoapRequest::new("Client.GetLists", "k").namespace("http://example.com/api/");
        assert_eq!(request.soap_action(), "\"http://example.com/api/Client.GetLists\"");
    }

    #[test]
    fn test_envelope_rejects_bad_action() {
        let err = SoapRequest::new("not an action", "k").envelope().unwrap_err();
        assert!(matches!(err, CodecError::InvalidShape { .. }));
    }

    #[test]
    fn test_envelope_is_decodable() {
        let request = SoapRequest::new("Subscriber.Add", "k")
            .params(Tree::from([("ListID", Tree::from("42"))]));
        let body = request.envelope().unwrap();
        let tree = crate::xml::decode(&body, Some(SOAP_BODY_SCOPE)).unwrap();
        assert_eq!(
            tree,
            Tree::from([(
                "Subscriber.Add",
                Tree::from([("ApiKey", Tree::from("k")), ("ListID", Tree::from("42"))])
            )])
        );
    }

    #[test]
    fn test_decode_soap_response_unwraps_result() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <User.GetClientsResponse xmlns="http://api.createsend.com/api/">
      <User.GetClientsResult>
        <Client><ClientID>1</ClientID><Name>One</Name></Client>
        <Client><ClientID>2</ClientID><Name>Two</Name></Client>
      </User.GetClientsResult>
    </User.GetClientsResponse>
  </soap:Body>
</soap:Envelope>"#;

        let result = decode_soap_response(xml, "User.GetClients").unwrap().unwrap();
        let ids: Vec<_> = result
            .get("Client")
            .into_iter()
            .flat_map(Tree::items)
            .filter_map(|c| c.get("ClientID").and_then(Tree::as_str))
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_decode_soap_response_missing_result() {
        let xml = "<soap:Envelope><soap:Body><soap:Fault><faultstring>bad</faultstring>\
                   </soap:Fault></soap:Body></soap:Envelope>";
        assert_eq!(decode_soap_response(xml, "User.GetClients").unwrap(), None);
    }

    #[test]
    fn test_decode_soap_reader_small_window_and_charset() {
        let xml = b"<soap:Envelope><soap:Body><List.GetResponse><List.GetResult>\
                    <Title>Caf\xE9 news</Title><Segment>a</Segment><Segment>b</Segment>\
                    </List.GetResult></List.GetResponse></soap:Body></soap:Envelope>";
        let options = DecodeOptions::default()
            .window_size(4)
            .charset("iso-8859-1")
            .unwrap();

        let result = decode_soap_reader(&xml[..], "List.Get", &options).unwrap().unwrap();
        assert_eq!(result.get("Title").and_then(Tree::as_str), Some("Caf\u{e9} news"));
        assert_eq!(
            result.get("Segment"),
            Some(&Tree::List(vec![Tree::from("a"), Tree::from("b")]))
        );
    }

    #[test]
    fn test_decode_soap_reader_ignores_caller_scope() {
        let xml = "<soap:Envelope><soap:Body><X.GetResponse><X.GetResult><Code>0</Code>\
                   </X.GetResult></X.GetResponse></soap:Body></soap:Envelope>";
        let options = DecodeOptions::with_scope("/other").unwrap();
        let result = decode_soap_reader(xml.as_bytes(), "X.Get", &options).unwrap();
        assert_eq!(result, Some(Tree::from([("Code", Tree::from("0"))])));
    }
}
