//! MBAP header framing and function-code/exception-code naming.
//!
//! Function and exception code names follow common Modbus client/server
//! driver conventions in this codebase's wider lineage (see DESIGN.md).

pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;
pub const FC_WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// Exception bit OR'd into the function code of an error response.
pub const EXCEPTION_FLAG: u8 = 0x80;
pub const EXCEPTION_ILLEGAL_FUNCTION: u8 = 0x01;

pub const MBAP_HEADER_LEN: usize = 7;

/// The 7-byte MBAP header preceding every PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
    pub transaction_id: u16,
    pub protocol_id: u16,
    /// Byte count of everything following this field: `unit_id` plus PDU.
    pub length: u16,
    pub unit_id: u8,
}

impl MbapHeader {
    pub fn decode(bytes: &[u8; MBAP_HEADER_LEN]) -> Self {
        Self {
            transaction_id: u16::from_be_bytes([bytes[0], bytes[1]]),
            protocol_id: u16::from_be_bytes([bytes[2], bytes[3]]),
            length: u16::from_be_bytes([bytes[4], bytes[5]]),
            unit_id: bytes[6],
        }
    }

    pub fn encode(&self) -> [u8; MBAP_HEADER_LEN] {
        let mut out = [0u8; MBAP_HEADER_LEN];
        out[0..2].copy_from_slice(&self.transaction_id.to_be_bytes());
        out[2..4].copy_from_slice(&self.protocol_id.to_be_bytes());
        out[4..6].copy_from_slice(&self.length.to_be_bytes());
        out[6] = self.unit_id;
        out
    }

    /// Build the response header for a given request header and PDU length:
    /// reuses `transaction_id`/`unit_id`, recomputes `length`.
    pub fn response_for(&self, pdu_len: usize) -> Self {
        Self {
            transaction_id: self.transaction_id,
            protocol_id: 0x0000,
            length: (1 + pdu_len) as u16,
            unit_id: self.unit_id,
        }
    }
}

/// Wrap a PDU with its MBAP header, ready to write to the socket.
pub fn frame_response(header: &MbapHeader, pdu: &[u8]) -> Vec<u8> {
    let response_header = header.response_for(pdu.len());
    let mut out = Vec::with_capacity(MBAP_HEADER_LEN + pdu.len());
    out.extend_from_slice(&response_header.encode());
    out.extend_from_slice(pdu);
    out
}

/// Build an exception response PDU: `fc | 0x80, exception_code`.
pub fn exception_pdu(function_code: u8, exception_code: u8) -> Vec<u8> {
    vec![function_code | EXCEPTION_FLAG, exception_code]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn header_round_trips() {
        let header = MbapHeader {
            transaction_id: 0x1234,
            protocol_id: 0,
            length: 6,
            unit_id: 1,
        };
        let encoded = header.encode();
        assert_eq!(MbapHeader::decode(&encoded), header);
    }

    #[test]
    fn response_reuses_transaction_and_unit_id() {
        let request = MbapHeader {
            transaction_id: 77,
            protocol_id: 0,
            unit_id: 3,
            length: 6,
        };
        let response = request.response_for(5);
        assert_eq!(response.transaction_id, 77);
        assert_eq!(response.unit_id, 3);
        assert_eq!(response.length, 6);
    }

    #[test]
    fn exception_pdu_sets_high_bit() {
        let pdu = exception_pdu(0x04, EXCEPTION_ILLEGAL_FUNCTION);
        assert_eq!(pdu, vec![0x84, 0x01]);
    }
}
