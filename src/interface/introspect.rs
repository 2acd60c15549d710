//! Rendering of the D-Bus introspection XML dialect.

use crate::signature::next_type;
use crate::{Interface, Signature};

use super::Member;

const DOCTYPE: &str = "<!DOCTYPE node PUBLIC \"-//freedesktop/DTD D-BUS Object Introspection 1.0//EN\"\n\"http://www.freedesktop.org/standards/dbus/1.0/introspect.dtd\">\n";

/// The builtin interfaces present on every bound node.
const BUILTINS: &str = "\t<interface name=\"org.freedesktop.DBus.Introspectable\">\n\
\t\t<method name=\"Introspect\">\n\
\t\t\t<arg type=\"s\" name=\"xml_data\" direction=\"out\"/>\n\
\t\t</method>\n\
\t</interface>\n\
\t<interface name=\"org.freedesktop.DBus.Properties\">\n\
\t\t<method name=\"Get\">\n\
\t\t\t<arg type=\"s\" name=\"interface_name\"/>\n\
\t\t\t<arg type=\"s\" name=\"property_name\"/>\n\
\t\t\t<arg type=\"v\" name=\"value\" direction=\"out\"/>\n\
\t\t</method>\n\
\t\t<method name=\"GetAll\">\n\
\t\t\t<arg type=\"s\" name=\"interface_name\"/>\n\
\t\t\t<arg type=\"a{sv}\" name=\"props\" direction=\"out\"/>\n\
\t\t</method>\n\
\t\t<method name=\"Set\">\n\
\t\t\t<arg type=\"s\" name=\"interface_name\"/>\n\
\t\t\t<arg type=\"s\" name=\"property_name\"/>\n\
\t\t\t<arg type=\"v\" name=\"value\"/>\n\
\t\t</method>\n\
\t</interface>\n";

/// Render the introspection document for a node with the given bound
/// interfaces and immediate children.
pub(crate) fn node_to_xml<'a, I, C>(interfaces: I, children: C) -> String
where
    I: IntoIterator<Item = &'a Interface>,
    C: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    out.push_str(DOCTYPE);
    out.push_str("<node>\n");

    for interface in interfaces {
        interface_to_xml(&mut out, interface);
    }

    out.push_str(BUILTINS);

    for child in children {
        out.push_str("\t<node name=\"");
        out.push_str(child);
        out.push_str("\"/>\n");
    }

    out.push_str("</node>\n");
    out
}

fn interface_to_xml(out: &mut String, interface: &Interface) {
    out.push_str("\t<interface name=\"");
    out.push_str(interface.name());
    out.push_str("\">\n");

    annotations_to_xml(out, interface.annotations(), "\t\t");

    for (name, member) in interface.members() {
        member_to_xml(out, name, member);
    }

    out.push_str("\t</interface>\n");
}

fn member_to_xml(out: &mut String, name: &str, member: &Member) {
    match member {
        Member::Method(method) => {
            out.push_str("\t\t<method name=\"");
            out.push_str(name);
            out.push_str("\">\n");
            annotations_to_xml(out, &method.annotations, "\t\t\t");
            args_to_xml(out, &method.args, &method.arg_names, None);
            args_to_xml(out, &method.returns, &method.return_names, Some("out"));
            out.push_str("\t\t</method>\n");
        }
        Member::Signal(signal) => {
            out.push_str("\t\t<signal name=\"");
            out.push_str(name);
            out.push_str("\">\n");
            annotations_to_xml(out, &signal.annotations, "\t\t\t");
            args_to_xml(out, &signal.args, &signal.arg_names, None);
            out.push_str("\t\t</signal>\n");
        }
        Member::Property(property) => {
            out.push_str("\t\t<property name=\"");
            out.push_str(name);
            out.push_str("\" type=\"");
            out.push_str(property.signature.as_str());
            out.push_str("\" access=\"");

            match (property.get.is_some(), property.set.is_some()) {
                (true, true) => out.push_str("readwrite"),
                (true, false) => out.push_str("read"),
                _ => out.push_str("write"),
            }

            if property.annotations.is_empty() {
                out.push_str("\"/>\n");
            } else {
                out.push_str("\">\n");
                annotations_to_xml(out, &property.annotations, "\t\t\t");
                out.push_str("\t\t</property>\n");
            }
        }
    }
}

/// Write one `<arg/>` element per complete type in the signature, naming
/// each as far as names have been supplied.
fn args_to_xml(
    out: &mut String,
    signature: &Signature,
    names: &[Box<str>],
    direction: Option<&str>,
) {
    let mut sig = signature.as_bytes();
    let mut index = 0;

    while let Some(n) = next_type(sig) {
        out.push_str("\t\t\t<arg type=\"");
        out.push_str(core::str::from_utf8(&sig[..n]).unwrap_or_default());
        out.push('"');

        if let Some(name) = names.get(index) {
            out.push_str(" name=\"");
            out.push_str(name);
            out.push('"');
        }

        if let Some(direction) = direction {
            out.push_str(" direction=\"");
            out.push_str(direction);
            out.push('"');
        }

        out.push_str("/>\n");
        sig = &sig[n..];
        index += 1;
    }
}

fn annotations_to_xml(out: &mut String, annotations: &[(Box<str>, Box<str>)], indent: &str) {
    for (name, value) in annotations {
        out.push_str(indent);
        out.push_str("<annotation name=\"");
        out.push_str(name);
        out.push_str("\" value=\"");
        out.push_str(value);
        out.push_str("\"/>\n");
    }
}
