//! Utility functions for XLS parsing

/// Error codes of BOOLERR cells and formula results
static ERROR_TEXT: phf::Map<u8, &'static str> = phf::phf_map! {
    0x00u8 => "#NULL!",
    0x07u8 => "#DIV/0!",
    0x0Fu8 => "#VALUE!",
    0x17u8 => "#REF!",
    0x1Du8 => "#NAME?",
    0x24u8 => "#NUM!",
    0x2Au8 => "#N/A",
    0x2Bu8 => "#GETTING_DATA",
};

/// Text of an Excel error code, `None` for codes Excel never writes
pub fn error_text(code: u8) -> Option<&'static str> {
    ERROR_TEXT.get(&code).copied()
}

/// Convert RK value to f64
///
/// Bit 1 set: the top 30 bits are a signed integer. Otherwise they are the
/// top 30 bits of an IEEE double whose remaining 34 bits are zero. Bit 0 set
/// divides the result by 100.
///
/// # Examples
///
/// ```
/// use litchi_xls::ole::xls::utils::rk_to_f64;
/// assert_eq!(rk_to_f64(0x3FF0_0000), 1.0);
/// assert_eq!(rk_to_f64((1234 << 2) | 0x03), 12.34);
/// ```
pub fn rk_to_f64(rk: u32) -> f64 {
    let value = if rk & 0x02 != 0 {
        ((rk as i32) >> 2) as f64
    } else {
        f64::from_bits(((rk & 0xFFFF_FFFC) as u64) << 32)
    };
    if rk & 0x01 != 0 { value / 100.0 } else { value }
}

/// Column name in A1 notation: 0 -> "A", 25 -> "Z", 26 -> "AA"
pub fn colname(col: u32) -> String {
    let mut letters = [0u8; 8];
    let mut at = letters.len();
    let mut n = col as u64 + 1;
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        at -= 1;
        letters[at] = b'A' + rem;
        n = (n - 1) / 26;
    }
    String::from_utf8_lossy(&letters[at..]).into_owned()
}

/// Relative A1 name of a cell: (0, 0) -> "A1"
pub fn cellname(row: u32, col: u32) -> String {
    let mut buffer = itoa::Buffer::new();
    let mut name = colname(col);
    name.push_str(buffer.format(row as u64 + 1));
    name
}

/// Absolute name of a cell: "$A$1", or "R1C1" in R1C1 style
pub fn cellnameabs(row: u32, col: u32, r1c1: bool) -> String {
    let mut buffer = itoa::Buffer::new();
    if r1c1 {
        let mut name = String::from("R");
        name.push_str(buffer.format(row as u64 + 1));
        name.push('C');
        name.push_str(buffer.format(col as u64 + 1));
        return name;
    }
    let mut name = String::from("$");
    name.push_str(&colname(col));
    name.push('$');
    name.push_str(buffer.format(row as u64 + 1));
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rk_integer_forms() {
        assert_eq!(rk_to_f64((42 << 2) | 0x02), 42.0);
        assert_eq!(rk_to_f64(((-7i32 << 2) as u32) | 0x02), -7.0);
        assert_eq!(rk_to_f64((1234 << 2) | 0x03), 12.34);
    }

    #[test]
    fn test_rk_float_forms() {
        let bits = 2.5f64.to_bits();
        assert_eq!(rk_to_f64((bits >> 32) as u32), 2.5);
        let hundredfold = 1234.0f64.to_bits();
        assert_eq!(rk_to_f64(((hundredfold >> 32) as u32) | 0x01), 12.34);
    }

    #[test]
    fn test_colname() {
        assert_eq!(colname(0), "A");
        assert_eq!(colname(25), "Z");
        assert_eq!(colname(26), "AA");
        assert_eq!(colname(255), "IV");
        assert_eq!(colname(16383), "XFD");
    }

    #[test]
    fn test_cell_names() {
        assert_eq!(cellname(0, 0), "A1");
        assert_eq!(cellname(9, 27), "AB10");
        assert_eq!(cellnameabs(4, 2, false), "$C$5");
        assert_eq!(cellnameabs(4, 2, true), "R5C3");
    }

    #[test]
    fn test_error_text() {
        assert_eq!(error_text(0x07), Some("#DIV/0!"));
        assert_eq!(error_text(0x2A), Some("#N/A"));
        assert_eq!(error_text(0x99), None);
    }
}
