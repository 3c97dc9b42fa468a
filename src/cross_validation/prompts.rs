// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prompt templates for the cross-validation model

use super::{BusinessType, DocumentType};

const TEXT_PLACEHOLDER: &str = "{{text}}";

const CLASSIFICATION: &str = "\
다음은 사업자등록증 OCR 텍스트이다. 법인사업자이면 CORPORATE, 개인사업자이면 INDIVIDUAL, \
판단할 수 없으면 UNKNOWN 한 단어로만 답하라.

{{text}}";

const INDIVIDUAL: &str = r#"### ROLE
너는 개인사업자등록증 검수관이다. 아래 텍스트는 여러 OCR 엔진의 결과를 엔진별로 나열한 것이다.

### RULES
1. 엔진 간 결과를 비교해 깨진 문자만 교정하라. 정상적인 한글, 숫자, 하이픈은 그대로 둔다.
2. 자간 공백은 병합하라 ('대 표 자' -> '대표자').
3. 확인할 수 없는 필드는 빈 문자열("")로 둔다. 없는 정보를 지어내지 마라.
4. 개인사업자에는 법인등록번호와 본점소재지가 없다.

### OCR TEXT
{{text}}

### OUTPUT (JSON only)
{
  "documentType": "개인사업자",
  "merchantName": "상호",
  "businessNumber": "XXX-XX-XXXXX",
  "representativeName": "대표자",
  "openingDate": "YYYY-MM-DD",
  "address": "사업장 소재지",
  "businessType": "업태",
  "businessItem": "종목",
  "taxOffice": "세무서"
}"#;

const CORPORATE: &str = r#"### ROLE
너는 법인사업자등록증 검수관이다. 아래 텍스트는 여러 OCR 엔진의 결과를 엔진별로 나열한 것이다.

### RULES
1. 엔진 간 결과를 비교해 깨진 문자만 교정하라. 정상적인 한글, 숫자, 하이픈은 그대로 둔다.
2. 자간 공백은 병합하라 ('법 인 등 록 번 호' -> '법인등록번호').
3. 확인할 수 없는 필드는 빈 문자열("")로 둔다. 없는 정보를 지어내지 마라.
4. 법인등록번호는 XXXXXX-XXXXXXX 형식의 13자리 숫자이다.

### OCR TEXT
{{text}}

### OUTPUT (JSON only)
{
  "documentType": "법인사업자",
  "merchantName": "법인명(단체명)",
  "businessNumber": "XXX-XX-XXXXX",
  "representativeName": "대표자",
  "openingDate": "YYYY-MM-DD",
  "corporateNumber": "XXXXXX-XXXXXXX",
  "address": "사업장 소재지",
  "headOfficeAddress": "본점 소재지",
  "businessType": "업태",
  "businessItem": "종목",
  "taxOffice": "세무서"
}"#;

const ID_CARD: &str = r#"### ROLE
너는 주민등록증 OCR 텍스트 교정관이다. 아래 텍스트는 여러 OCR 엔진의 결과를 엔진별로 나열한 것이다.

### RULES
1. 깨진 문자만 교정하라. 정상적인 한글, 숫자, 하이픈은 그대로 둔다.
2. 자간 공백은 병합하라 ('주 민 등 록 증' -> '주민등록증').
3. 확인할 수 없는 필드는 빈 문자열("")로 둔다. 없는 정보를 지어내지 마라.
4. 주민등록번호 뒷자리는 반드시 마스킹하라 (XXXXXX-*******).
5. 발급기관은 시/군/구청장 또는 읍/면/동장이다.

### OCR TEXT
{{text}}

### OUTPUT (JSON only)
{
  "documentType": "주민등록증",
  "name": "성명",
  "rrn": "XXXXXX-*******",
  "address": "주소",
  "issueDate": "YYYY-MM-DD",
  "issuer": "발급기관"
}"#;

const DRIVER_LICENSE: &str = r#"### ROLE
너는 운전면허증 OCR 텍스트 교정관이다. 아래 텍스트는 여러 OCR 엔진의 결과를 엔진별로 나열한 것이다.

### RULES
1. 엔진 간 결과를 비교해 가장 신뢰할 수 있는 값을 골라라. 정상적인 한글, 숫자, 하이픈은 그대로 둔다.
2. 자간 공백은 병합하라 ('면 허 번 호' -> '면허번호', '1 종 보 통' -> '1종보통').
3. 확인할 수 없는 필드는 빈 문자열("")로 둔다. 없는 정보를 지어내지 마라.
4. 면허번호는 XX-XX-XXXXXX-XX 형식의 12자리 숫자이다. 잘린 값을 내지 마라.
5. 면허종류가 '종보통'처럼 잘리면 앞의 숫자를 보완하라.
6. 발급일은 'XX지방경찰청장' 바로 앞의 날짜이다. 적성검사일이나 유효기간 만료일과 혼동하지 마라.
7. 암호일련번호는 우측 하단의 영문과 숫자 조합이다.

### OCR TEXT
{{text}}

### OUTPUT (JSON only)
{
  "documentType": "운전면허증",
  "name": "성명",
  "rrn": "XXXXXX-XXXXXXX",
  "licenseNumber": "XX-XX-XXXXXX-XX",
  "licenseType": "1종보통",
  "address": "주소",
  "issueDate": "YYYY-MM-DD",
  "serialNumber": "암호일련번호"
}"#;

/// Field-parsing prompt for a document
///
/// Business licenses pick the template by business type; unknown business
/// types use the individual template.
pub fn field_parsing_prompt(
    document_type: DocumentType,
    business_type: BusinessType,
    text: &str,
) -> String {
    let template = match (document_type, business_type) {
        (DocumentType::IdCard, _) => ID_CARD,
        (DocumentType::DriverLicense, _) => DRIVER_LICENSE,
        (DocumentType::BusinessLicense, BusinessType::Corporate) => CORPORATE,
        (DocumentType::BusinessLicense, _) => INDIVIDUAL,
    };
    template.replace(TEXT_PLACEHOLDER, text)
}

pub fn classification_prompt(text: &str) -> String {
    CLASSIFICATION.replace(TEXT_PLACEHOLDER, text)
}
