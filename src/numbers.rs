// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Float formatting in the style of C's `%.<precision>g`.

fn strip_fraction_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// `d` with `precision` significant digits, switching to exponent notation
/// for very large or very small magnitudes. Trailing zeros are dropped.
pub fn format_g(d: f64, precision: usize) -> String {
    let precision = precision.max(1);
    if d.is_nan() {
        return "nan".to_string();
    }
    if d.is_infinite() {
        return if d < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    if d == 0.0 {
        return if d.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let sci = format!("{:.*e}", precision - 1, d);
    let (mantissa, exponent) = match sci.rsplit_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            strip_fraction_zeros(mantissa),
            sign,
            exponent.abs()
        )
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        strip_fraction_zeros(&format!("{d:.decimals$}")).to_string()
    }
}

/// `format_g`, but always recognisable as a float: `.0` is appended when the
/// result would otherwise read as an integer.
pub fn format_float_literal(d: f64, precision: usize) -> String {
    let mut s = format_g(d, precision);
    if d.is_finite() && !s.contains(['.', 'e']) {
        s.push_str(".0");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_g_fixed() {
        assert_eq!(format_g(1.5, 15), "1.5");
        assert_eq!(format_g(100.0, 15), "100");
        assert_eq!(format_g(-0.25, 15), "-0.25");
        assert_eq!(format_g(0.0001, 15), "0.0001");
        assert_eq!(format_g(123456.0, 6), "123456");
    }

    #[test]
    fn test_format_g_exponent() {
        assert_eq!(format_g(0.00001, 15), "1e-05");
        assert_eq!(format_g(1.5e20, 15), "1.5e+20");
        assert_eq!(format_g(1234567.0, 6), "1.23457e+06");
        assert_eq!(format_g(-2.5e-300, 15), "-2.5e-300");
    }

    #[test]
    fn test_format_g_special() {
        assert_eq!(format_g(0.0, 15), "0");
        assert_eq!(format_g(f64::INFINITY, 15), "inf");
        assert_eq!(format_g(f64::NAN, 15), "nan");
    }

    #[test]
    fn test_db_precision_round_trips() {
        for d in [0.1, 1.0 / 3.0, std::f64::consts::PI, 6.02214076e23, -1.0e-10] {
            let text = format_g(d, 19);
            assert_eq!(text.parse::<f64>().unwrap(), d, "{text}");
        }
    }

    #[test]
    fn test_float_literal() {
        assert_eq!(format_float_literal(3.0, 15), "3.0");
        assert_eq!(format_float_literal(3.25, 15), "3.25");
        assert_eq!(format_float_literal(1e100, 15), "1e+100");
    }
}
