use std::ops::BitAnd;

pub fn has_flag<U, T: Into<U>>(value: U, flag: T) -> bool
where
    U: BitAnd<Output = U> + PartialEq + Copy,
{
    let flag = flag.into();

    value & flag == flag
}

/// Split a method descriptor's parameter segment into one type string per
/// parameter. Sub-int primitives (B, C, S, Z) widen to "I"; array and class
/// descriptors are kept verbatim.
pub fn parse_incoming_params_from_meth_type(meth_type: &str) -> Vec<String> {
    let params = match (meth_type.find('('), meth_type.rfind(')')) {
        (Some(open), Some(close)) if open < close => &meth_type[open + 1..close],
        _ => return vec![],
    };

    let bytes = params.as_bytes();
    let mut res = vec![];
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        while i < bytes.len() && bytes[i] == b'[' {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        if bytes[i] == b'L' {
            match params[i..].find(';') {
                Some(semi) => i += semi + 1,
                None => break,
            }
        } else {
            i += 1;
        }

        let token = &params[start..i];
        res.push(widen(token));
    }
    res
}

// an int is an int is an int: everything narrower than I takes an int slot
fn widen(token: &str) -> String {
    match token {
        "B" | "C" | "I" | "S" | "Z" => "I".to_string(),
        other => other.to_string(),
    }
}
